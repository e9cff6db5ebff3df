//! Query-string persistence of the extraction form.
//!
//! The encoded form is the shareable state of a session: it is written with
//! replace semantics (the current entry is overwritten, no new entry is
//! created) and decoded on startup to restore an identical form.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::{form_urlencoded, Url};

use crate::config::{app_state_path, state_env_dirs, ConfigPathError};
use crate::form::{FormField, FormState};

const STATE_APP_DIR: &str = "scorecap";
const STATE_FILE: &str = "last_session";

#[derive(Debug, Error)]
pub enum UrlStateError {
    #[error("invalid share link {link:?}: {source}")]
    InvalidLink {
        link: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to resolve session state path: {0:?}")]
    StatePath(ConfigPathError),
    #[error("failed to write session state {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type UrlStateResult<T> = std::result::Result<T, UrlStateError>;

/// Encodes the tracked form fields as `application/x-www-form-urlencoded`.
pub fn encode_query(form: &FormState) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(
            FormField::URL_TRACKED
                .into_iter()
                .map(|field| (field.key(), form.value(field))),
        )
        .finish()
}

/// Decodes tracked fields from a query string, in canonical field order.
///
/// A leading `?` is accepted, unknown keys are ignored and the last
/// occurrence of a repeated key wins.
pub fn decode_query(query: &str) -> Vec<(FormField, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut found: Vec<(FormField, String)> = Vec::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let Some(field) = FormField::from_key(&key).filter(|field| field.is_url_tracked()) else {
            continue;
        };
        found.retain(|(existing, _)| *existing != field);
        found.push((field, value.into_owned()));
    }

    FormField::URL_TRACKED
        .into_iter()
        .filter_map(|field| {
            found
                .iter()
                .find(|(candidate, _)| *candidate == field)
                .cloned()
        })
        .collect()
}

/// Full link that restores `form` when opened.
pub fn share_link(base: &str, form: &FormState) -> UrlStateResult<String> {
    let mut url = Url::parse(base).map_err(|source| UrlStateError::InvalidLink {
        link: base.to_string(),
        source,
    })?;
    url.set_query(Some(&encode_query(form)));
    Ok(url.to_string())
}

/// Extracts the query part of a share link, or returns a bare query unchanged.
pub fn query_from_link(link: &str) -> UrlStateResult<String> {
    let trimmed = link.trim();
    if !trimmed.contains("://") {
        return Ok(trimmed.trim_start_matches('?').to_string());
    }
    let url = Url::parse(trimmed).map_err(|source| UrlStateError::InvalidLink {
        link: trimmed.to_string(),
        source,
    })?;
    Ok(url.query().unwrap_or_default().to_string())
}

/// Holder of the current session entry.
pub trait History {
    fn current_query(&self) -> Option<String>;
    /// Overwrites the current entry; never adds a new one.
    fn replace_query(&mut self, query: &str);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryHistory {
    entry: Option<String>,
    replacements: usize,
}

impl MemoryHistory {
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            entry: Some(query.into()),
            replacements: 0,
        }
    }

    pub fn replacements(&self) -> usize {
        self.replacements
    }

    /// Number of entries held; replacing never grows it past one.
    pub fn len(&self) -> usize {
        usize::from(self.entry.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

impl History for MemoryHistory {
    fn current_query(&self) -> Option<String> {
        self.entry.clone()
    }

    fn replace_query(&mut self, query: &str) {
        self.entry = Some(query.to_string());
        self.replacements += 1;
    }
}

/// Session entry persisted in a single state file between launches.
#[derive(Debug, Clone)]
pub struct FileHistory {
    path: PathBuf,
}

impl FileHistory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn with_default_path() -> UrlStateResult<Self> {
        let (xdg_state_home, home) = state_env_dirs();
        let path = app_state_path(
            STATE_APP_DIR,
            STATE_FILE,
            xdg_state_home.as_deref(),
            home.as_deref(),
        )
        .map_err(UrlStateError::StatePath)?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, query: &str) -> UrlStateResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| UrlStateError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, query).map_err(|source| UrlStateError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl History for FileHistory {
    fn current_query(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Some(contents.trim().to_string()).filter(|query| !query.is_empty()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(?err, path = %self.path.display(), "failed to read session state");
                None
            }
        }
    }

    fn replace_query(&mut self, query: &str) {
        if let Err(err) = self.write(query) {
            tracing::warn!(?err, "failed to persist session state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Coordinate;

    #[test]
    fn encode_then_decode_reproduces_tracked_values() {
        let mut form = FormState::default();
        form.set_value(FormField::Threshold, "2.5");
        form.set_value(FormField::Coordinate(Coordinate::XStart), "10");
        form.set_value(FormField::Coordinate(Coordinate::XEnd), "90");
        form.set_value(FormField::Url, "https://www.youtube.com/watch?v=abc12345678&t=3");
        form.set_value(FormField::StartTime, "1:05");

        let decoded = decode_query(&encode_query(&form));
        assert_eq!(decoded.len(), FormField::URL_TRACKED.len());
        for (field, value) in decoded {
            assert_eq!(value, form.value(field), "{field:?}");
        }
    }

    #[test]
    fn encode_uses_canonical_field_order() {
        let query = encode_query(&FormState::default());
        let keys: Vec<&str> = query
            .split('&')
            .filter_map(|pair| pair.split('=').next())
            .collect();
        assert_eq!(
            keys,
            FormField::URL_TRACKED
                .iter()
                .map(|field| field.key())
                .collect::<Vec<_>>()
        );
        assert!(query.contains("start_time=0%3A00"));
    }

    #[test]
    fn decode_ignores_unknown_and_untracked_keys() {
        let decoded = decode_query("?threshold=2.5&foo=bar&inspection_mode=true&x_start=10");
        assert_eq!(
            decoded,
            vec![
                (FormField::Coordinate(Coordinate::XStart), "10".to_string()),
                (FormField::Threshold, "2.5".to_string()),
            ]
        );
    }

    #[test]
    fn decode_keeps_last_repeated_value() {
        let decoded = decode_query("x_end=40&x_end=90");
        assert_eq!(
            decoded,
            vec![(FormField::Coordinate(Coordinate::XEnd), "90".to_string())]
        );
    }

    #[test]
    fn share_link_and_query_from_link_agree() {
        let mut form = FormState::default();
        form.set_value(FormField::Threshold, "7.5");
        let link = share_link("http://127.0.0.1:5000/", &form).expect("base url should parse");
        assert!(link.starts_with("http://127.0.0.1:5000/?url="));

        let query = query_from_link(&link).expect("share link should parse");
        assert_eq!(query, encode_query(&form));
        assert_eq!(
            query_from_link("?threshold=2").expect("bare query"),
            "threshold=2"
        );
    }

    #[test]
    fn memory_history_replaces_instead_of_pushing() {
        let mut history = MemoryHistory::default();
        history.replace_query("a=1");
        history.replace_query("a=2");
        assert_eq!(history.len(), 1);
        assert_eq!(history.replacements(), 2);
        assert_eq!(history.current_query().as_deref(), Some("a=2"));
    }

    #[test]
    fn file_history_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let mut history = FileHistory::new(dir.path().join("nested").join(STATE_FILE));
        assert_eq!(history.current_query(), None);

        history.replace_query("threshold=3.0");
        assert_eq!(history.current_query().as_deref(), Some("threshold=3.0"));
    }
}
