use serde::Serialize;

use super::{BackendError, BackendResult};

pub const FORMSPREE_ENDPOINT: &str = "https://formspree.io/f";

/// Anonymous bug report; only the HTTP status of the submission matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BugReport {
    pub message: String,
    #[serde(rename = "_replyto")]
    pub reply_to: String,
    pub info: String,
}

impl BugReport {
    pub fn new(message: impl Into<String>, reply_to: Option<&str>) -> Self {
        Self {
            message: message.into(),
            reply_to: reply_to.unwrap_or_default().to_string(),
            info: environment_info(),
        }
    }
}

fn environment_info() -> String {
    format!(
        "{} {} ({}/{})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[derive(Debug, Clone)]
pub struct BugReporter {
    client: reqwest::blocking::Client,
    form_id: Option<String>,
}

impl BugReporter {
    pub fn new(client: reqwest::blocking::Client, form_id: Option<String>) -> Self {
        Self {
            client,
            form_id: form_id.filter(|id| !id.trim().is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.form_id.is_some()
    }

    pub fn endpoint(&self) -> Option<String> {
        self.form_id
            .as_deref()
            .map(|id| format!("{FORMSPREE_ENDPOINT}/{id}"))
    }

    pub fn submit(&self, report: &BugReport) -> BackendResult<()> {
        let endpoint = self.endpoint().ok_or(BackendError::ReportingDisabled)?;
        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(report)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "bug report rejected");
            return Err(BackendError::Server {
                status: status.as_u16(),
                message: format!("bug report rejected with status {status}"),
            });
        }
        tracing::info!("bug report submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_reply_to_under_formspree_key() {
        let report = BugReport {
            message: "preview stays dark".to_string(),
            reply_to: "me@example.com".to_string(),
            info: "scorecap 0.1.0 (linux/x86_64)".to_string(),
        };
        let value = serde_json::to_value(&report).expect("report should serialize");
        assert_eq!(value["_replyto"], "me@example.com");
        assert_eq!(value["message"], "preview stays dark");
        assert!(value.get("reply_to").is_none());
    }

    #[test]
    fn reporter_without_form_id_is_disabled() {
        let reporter = BugReporter::new(reqwest::blocking::Client::new(), Some("  ".to_string()));
        assert!(!reporter.is_enabled());
        let err = reporter
            .submit(&BugReport::new("x", None))
            .expect_err("missing form id must not send");
        assert!(matches!(err, BackendError::ReportingDisabled));
    }

    #[test]
    fn reporter_targets_form_endpoint() {
        let reporter = BugReporter::new(reqwest::blocking::Client::new(), Some("abcd1234".into()));
        assert_eq!(
            reporter.endpoint().as_deref(),
            Some("https://formspree.io/f/abcd1234")
        );
        assert!(BugReport::new("x", None).info.starts_with("scorecap "));
    }
}
