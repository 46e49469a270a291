use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// Errors surfaced by this library.
///
/// The taxonomy keeps "the server said no" ([`IngestError::Api`]) apart from
/// "the server never answered" ([`IngestError::Network`]): the former carries
/// an HTTP status to branch on, the latter keeps its transport-level identity.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A required local input file does not exist.
    #[error("file not found: {}", .path.display())]
    LocalFile { path: PathBuf },

    /// Metadata or local configuration is missing, malformed, or incomplete.
    ///
    /// The underlying cause (e.g. a YAML parse failure) is preserved as the
    /// error source rather than surfaced directly.
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The API responded with a non-2xx status.
    ///
    /// `details` is the parsed JSON error body when the server sent one,
    /// otherwise the raw response text as a JSON string.
    #[error("API request failed: HTTP {status} for url ({url}): {}", detail_text(.details))]
    Api {
        status: u16,
        url: String,
        details: Value,
    },

    /// The request never completed: DNS failure, refused connection, timeout.
    #[error("could not connect to the ingestion API")]
    Network(#[from] reqwest::Error),

    /// Local I/O failure while writing a downloaded file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A success response whose body was not the promised JSON.
    #[error("failed to decode API response (url={url})")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl IngestError {
    pub(crate) fn local_file(path: &Path) -> Self {
        Self::LocalFile {
            path: path.to_path_buf(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn config_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// HTTP status code, when the server answered with an error status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Best-effort `detail` text from an API error body.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Api { details, .. } => {
                let text = detail_text(details);
                if text.is_empty() { None } else { Some(text) }
            }
            _ => None,
        }
    }
}

/// Error payload shape used by the ingestion service.
// Some endpoints respond with {"message":...} instead of {"detail":...}.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn detail_text(details: &Value) -> String {
    if let Value::String(s) = details {
        return s.clone();
    }
    if let Ok(body) = ApiErrorBody::deserialize(details) {
        if let Some(d) = body.detail.or(body.message) {
            return d;
        }
    }
    details.to_string()
}

/// Maps a non-2xx response to [`IngestError::Api`], parsing the body as JSON
/// when possible and falling back to the raw text.
pub(crate) fn api_error(status: StatusCode, url: &str, body: String) -> IngestError {
    let details = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
    IngestError::Api {
        status: status.as_u16(),
        url: url.to_string(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_parses_json_detail() {
        let err = api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "http://localhost:8001/uploadfile/",
            r#"{"detail": "bad file"}"#.to_string(),
        );
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.detail().as_deref(), Some("bad file"));
        let text = err.to_string();
        assert!(text.contains("422"), "{text}");
        assert!(text.contains("bad file"), "{text}");
    }

    #[test]
    fn api_error_keeps_raw_text_when_body_is_not_json() {
        let err = api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "http://localhost:8001/search/",
            "everything is on fire".to_string(),
        );
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.detail().as_deref(), Some("everything is on fire"));
    }

    #[test]
    fn message_key_is_accepted_as_detail() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            "http://localhost:8001/search/",
            r#"{"message": "unknown filter"}"#.to_string(),
        );
        assert_eq!(err.detail().as_deref(), Some("unknown filter"));
    }

    #[test]
    fn non_api_errors_have_no_status() {
        let err = IngestError::config("metadata is invalid");
        assert_eq!(err.status(), None);
        assert_eq!(err.detail(), None);
    }
}
