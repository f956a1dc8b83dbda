//! Error types for quire

use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};

use crate::response::ApiFailure;

/// Shown when the server replied but gave no usable message.
pub const GENERIC_REPLY_MESSAGE: &str = "An error occurred. Please try again.";
/// Shown when there is no reply and no error text at all.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Main error type for quire operations
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum QuireError {
    /// Transport-level failure: no usable reply from the server.
    #[error("request failed: {0}")]
    #[diagnostic(code(quire::http))]
    Http(#[from] reqwest::Error),

    /// The server replied with a failure.
    #[error("server rejected the request ({status}): {failure}")]
    #[diagnostic(code(quire::api))]
    Api { status: u16, failure: ApiFailure },

    /// Response body could not be parsed
    #[error(transparent)]
    #[diagnostic_source]
    Parse(#[from] ParseError),

    /// IO error
    #[error(transparent)]
    #[diagnostic(code(quire::io))]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    #[diagnostic(code(quire::config))]
    Config(String),

    #[error("not logged in")]
    #[diagnostic(code(quire::not_authenticated), help("run `quire login` first"))]
    NotAuthenticated,

    #[error("{0} not found")]
    #[diagnostic(code(quire::not_found))]
    NotFound(String),
}

impl QuireError {
    /// The single message a user should see for this error.
    ///
    /// Server replies win: the first entry of a field map, then a flat
    /// message, then a generic reply message. Without a reply the transport
    /// error's own text is used.
    pub fn user_message(&self) -> String {
        match self {
            QuireError::Api { failure, .. } => failure.to_string(),
            QuireError::Parse(_) => GENERIC_REPLY_MESSAGE.to_string(),
            QuireError::Http(err) => {
                let text = err.to_string();
                if text.trim().is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    text
                }
            }
            other => other.to_string(),
        }
    }

    /// Whether the server refused because the session is gone.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            QuireError::NotAuthenticated => true,
            QuireError::Api { status, .. } => *status == 401,
            QuireError::Http(err) => err.status().is_some_and(|s| s.as_u16() == 401),
            _ => false,
        }
    }
}

/// A response body that failed to parse, with the body as source code.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("could not parse response from {endpoint}")]
#[diagnostic(code(quire::parse))]
pub struct ParseError {
    endpoint: String,
    #[source]
    cause: serde_json::Error,
    #[source_code]
    src: NamedSource<String>,
    #[label("error")]
    err_location: SourceSpan,
}

impl ParseError {
    pub fn new(endpoint: impl Into<String>, body: String, cause: serde_json::Error) -> Self {
        let endpoint = endpoint.into();
        let offset = if cause.line() == 0 {
            SourceOffset::from(0)
        } else {
            SourceOffset::from_location(&body, cause.line(), cause.column())
        };
        Self {
            src: NamedSource::new(endpoint.clone(), body),
            endpoint,
            cause,
            err_location: SourceSpan::new(offset, 0),
        }
    }

    /// Parse failure of a local file rather than a response.
    pub fn from_file(path: &std::path::Path, body: String, cause: serde_json::Error) -> Self {
        Self::new(path.display().to_string(), body, cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_points_into_body() {
        let body = "{\n  \"status\": tru\n}".to_string();
        let cause = serde_json::from_str::<serde_json::Value>(&body)
            .err()
            .unwrap();
        let err = ParseError::new("/api/login", body, cause);
        assert!(err.err_location.offset() > 0);
        assert_eq!(err.to_string(), "could not parse response from /api/login");
    }

    #[test]
    fn test_user_message_for_replies() {
        let err = QuireError::Api {
            status: 400,
            failure: ApiFailure::Message("Email already exists".into()),
        };
        assert_eq!(err.user_message(), "Email already exists");

        let err = QuireError::Api {
            status: 500,
            failure: ApiFailure::Unspecified,
        };
        assert_eq!(err.user_message(), GENERIC_REPLY_MESSAGE);
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_unauthorized() {
        let err = QuireError::Api {
            status: 401,
            failure: ApiFailure::Unspecified,
        };
        assert!(err.is_unauthorized());
        assert!(QuireError::NotAuthenticated.is_unauthorized());
    }
}
