//! HTTP client for the extraction backend.
//!
//! Wraps the four endpoints the client consumes (`/get_frame`, `/execute`,
//! `/finalize` and the `/inspect/{session_id}` review page) using
//! [`reqwest`]'s blocking client. Calls are made from worker threads, never
//! from the UI thread.

mod report;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::form::FormState;

pub use report::{BugReport, BugReporter, FORMSPREE_ENDPOINT};

/// Message shown when a failed response carries no usable `{error}` body.
pub const GENERIC_SERVER_ERROR: &str = "unknown server error";

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced a response (network, DNS, TLS, timeout).
    #[error("server connection failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {message}")]
    InvalidResponse { message: String },

    #[error("bug reports are not configured")]
    ReportingDisabled,
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Candidate images await manual review on the inspection page.
    Inspection {
        session_id: String,
        inspect_url: String,
    },
    /// Finished PDF returned directly.
    Pdf(Vec<u8>),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InspectionBody {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct FinalizeRequest<'a> {
    session_id: &'a str,
    selected_images: &'a [String],
}

/// Operations the front-ends need from the extraction service.
pub trait SheetBackend {
    /// Single video frame at `start_time`, as an encoded image.
    fn get_frame(&self, url: &str, start_time: &str) -> BackendResult<Vec<u8>>;
    fn execute(&self, form: &FormState) -> BackendResult<ExecuteOutcome>;
    /// PDF assembled from a reviewed subset of session images.
    fn finalize(&self, session_id: &str, selected_images: &[String]) -> BackendResult<Vec<u8>>;
    fn fetch_thumbnail(&self, thumbnail_url: &str) -> BackendResult<Vec<u8>>;
    fn inspect_url(&self, session_id: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, client: reqwest::blocking::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> BackendResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::new(config.backend_url.clone(), client))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn ensure_success(
        response: reqwest::blocking::Response,
    ) -> BackendResult<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().map(|bytes| bytes.to_vec()).unwrap_or_default();
        let err = server_error(status.as_u16(), &body);
        tracing::warn!(status = status.as_u16(), %err, "backend request failed");
        Err(err)
    }
}

impl SheetBackend for HttpBackend {
    fn get_frame(&self, url: &str, start_time: &str) -> BackendResult<Vec<u8>> {
        tracing::debug!(%url, %start_time, "requesting frame preview");
        let form = reqwest::blocking::multipart::Form::new()
            .text("url", url.to_string())
            .text("start_time", start_time.to_string());
        let response = self
            .client
            .post(self.endpoint("get_frame"))
            .multipart(form)
            .send()?;
        Ok(Self::ensure_success(response)?.bytes()?.to_vec())
    }

    fn execute(&self, form: &FormState) -> BackendResult<ExecuteOutcome> {
        tracing::info!(
            url = %form.url,
            inspection = form.inspection_mode,
            "submitting extraction"
        );
        let body = form
            .multipart_fields()
            .into_iter()
            .fold(reqwest::blocking::multipart::Form::new(), |body, (name, value)| {
                body.text(name, value)
            });
        let response = self
            .client
            .post(self.endpoint("execute"))
            .multipart(body)
            .send()?;
        let response = Self::ensure_success(response)?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes()?.to_vec();
        classify_execute_response(content_type.as_deref(), body, |session_id| {
            self.inspect_url(session_id)
        })
    }

    fn finalize(&self, session_id: &str, selected_images: &[String]) -> BackendResult<Vec<u8>> {
        tracing::info!(
            %session_id,
            count = selected_images.len(),
            "finalizing reviewed session"
        );
        let response = self
            .client
            .post(self.endpoint("finalize"))
            .json(&FinalizeRequest {
                session_id,
                selected_images,
            })
            .send()?;
        Ok(Self::ensure_success(response)?.bytes()?.to_vec())
    }

    fn fetch_thumbnail(&self, thumbnail_url: &str) -> BackendResult<Vec<u8>> {
        let response = self.client.get(thumbnail_url).send()?;
        Ok(Self::ensure_success(response)?.bytes()?.to_vec())
    }

    fn inspect_url(&self, session_id: &str) -> String {
        self.endpoint(&format!("inspect/{session_id}"))
    }
}

/// Builds the error for a failed response, using its `{error}` text verbatim.
pub fn server_error(status: u16, body: &[u8]) -> BackendError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string());
    BackendError::Server { status, message }
}

/// Splits an execute response into an inspection session or a PDF download.
pub fn classify_execute_response(
    content_type: Option<&str>,
    body: Vec<u8>,
    inspect_url: impl Fn(&str) -> String,
) -> BackendResult<ExecuteOutcome> {
    let is_json = content_type.is_some_and(|value| value.starts_with(JSON_CONTENT_TYPE));
    if !is_json {
        if body.is_empty() {
            return Err(BackendError::InvalidResponse {
                message: "empty PDF body".to_string(),
            });
        }
        return Ok(ExecuteOutcome::Pdf(body));
    }

    let parsed: InspectionBody =
        serde_json::from_slice(&body).map_err(|err| BackendError::InvalidResponse {
            message: format!("malformed inspection body: {err}"),
        })?;
    let session_id = parsed
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BackendError::InvalidResponse {
            message: "inspection response without session_id".to_string(),
        })?;
    let inspect_url = inspect_url(&session_id);
    Ok(ExecuteOutcome::Inspection {
        session_id,
        inspect_url,
    })
}
