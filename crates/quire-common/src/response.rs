//! Server replies, parsed once at the API boundary.
//!
//! Every endpoint answers with an envelope of the shape
//! `{ status?, message?, data? }`. [`ApiReply::from_body`] turns the raw body
//! and HTTP status into either the typed payload or an [`ApiFailure`], so
//! nothing past this module inspects JSON shapes.

use std::fmt;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{GENERIC_REPLY_MESSAGE, ParseError};

/// Why the server refused a request.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFailure {
    /// A flat message, e.g. `"Invalid credentials"`.
    Message(String),
    /// Field-scoped messages in the order the server sent them.
    Fields(Vec<(String, String)>),
    /// The server replied without anything usable.
    Unspecified,
}

impl ApiFailure {
    fn from_message(message: Option<Value>) -> Self {
        match message {
            Some(Value::String(text)) if !text.trim().is_empty() => ApiFailure::Message(text),
            Some(Value::Object(map)) if !map.is_empty() => ApiFailure::Fields(fields_of(map)),
            _ => ApiFailure::Unspecified,
        }
    }

    /// Text shown to the user: the first field message, else the flat
    /// message, else a generic line.
    pub fn user_message(&self) -> &str {
        match self {
            ApiFailure::Fields(fields) => fields
                .first()
                .map(|(_, msg)| msg.as_str())
                .unwrap_or(GENERIC_REPLY_MESSAGE),
            ApiFailure::Message(text) => text,
            ApiFailure::Unspecified => GENERIC_REPLY_MESSAGE,
        }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

fn fields_of(map: Map<String, Value>) -> Vec<(String, String)> {
    map.into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Array(items) => items
                    .into_iter()
                    .find_map(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<bool>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply<T> {
    Ok { data: T },
    Fail(ApiFailure),
}

impl<T: DeserializeOwned> ApiReply<T> {
    /// Parse a response body. A success status with `status: false` in the
    /// envelope is still a failure. A failure body that is not JSON becomes
    /// [`ApiFailure::Unspecified`]; a success body that is not JSON, or whose
    /// `data` has the wrong shape, is a [`ParseError`].
    pub fn from_body(endpoint: &str, http_status: u16, body: &str) -> Result<Self, ParseError> {
        let success = (200..300).contains(&http_status);
        let envelope = if body.trim().is_empty() {
            Envelope {
                status: None,
                message: None,
                data: None,
            }
        } else {
            match serde_json::from_str::<Envelope>(body) {
                Ok(envelope) => envelope,
                Err(_) if !success => return Ok(ApiReply::Fail(ApiFailure::Unspecified)),
                Err(e) => return Err(ParseError::new(endpoint, body.to_string(), e)),
            }
        };

        if success && envelope.status != Some(false) {
            let data = envelope.data.unwrap_or(Value::Null);
            serde_json::from_value(data)
                .map(|data| ApiReply::Ok { data })
                .map_err(|e| ParseError::new(endpoint, body.to_string(), e))
        } else {
            Ok(ApiReply::Fail(ApiFailure::from_message(envelope.message)))
        }
    }
}

impl<T> ApiReply<T> {
    pub fn into_result(self) -> Result<T, ApiFailure> {
        match self {
            ApiReply::Ok { data } => Ok(data),
            ApiReply::Fail(failure) => Err(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_with_data() {
        let reply: ApiReply<Vec<u32>> =
            ApiReply::from_body("/api/listBlogs", 200, r#"{"status":true,"data":[1,2]}"#).unwrap();
        assert_eq!(reply, ApiReply::Ok { data: vec![1, 2] });
    }

    #[test]
    fn test_success_without_data_is_unit() {
        let reply: ApiReply<()> = ApiReply::from_body("/api/logout", 200, r#"{"status":true}"#).unwrap();
        assert_eq!(reply, ApiReply::Ok { data: () });
        let reply: ApiReply<()> = ApiReply::from_body("/api/deleteBlog/1", 200, "").unwrap();
        assert_eq!(reply, ApiReply::Ok { data: () });
    }

    #[test]
    fn test_status_false_is_failure() {
        let reply: ApiReply<()> = ApiReply::from_body(
            "/api/login",
            200,
            r#"{"status":false,"message":"Invalid credentials"}"#,
        )
        .unwrap();
        assert_eq!(
            reply,
            ApiReply::Fail(ApiFailure::Message("Invalid credentials".into()))
        );
    }

    #[test]
    fn test_field_map_keeps_order() {
        let reply: ApiReply<()> = ApiReply::from_body(
            "/api/register",
            422,
            r#"{"message":{"email":"Email taken","name":"Too short"}}"#,
        )
        .unwrap();
        let ApiReply::Fail(failure) = reply else {
            panic!("expected failure");
        };
        assert_eq!(failure.user_message(), "Email taken");
        assert_eq!(
            failure,
            ApiFailure::Fields(vec![
                ("email".into(), "Email taken".into()),
                ("name".into(), "Too short".into()),
            ])
        );
    }

    #[test]
    fn test_unusable_failure_bodies() {
        let reply: ApiReply<()> = ApiReply::from_body("/api/login", 500, "<html>oops</html>").unwrap();
        assert_eq!(reply, ApiReply::Fail(ApiFailure::Unspecified));
        let reply: ApiReply<()> = ApiReply::from_body("/api/login", 400, r#"{"message":{}}"#).unwrap();
        assert_eq!(reply, ApiReply::Fail(ApiFailure::Unspecified));
        assert_eq!(ApiFailure::Unspecified.to_string(), GENERIC_REPLY_MESSAGE);
    }

    #[test]
    fn test_malformed_success_is_parse_error() {
        let err = ApiReply::<Vec<u32>>::from_body("/api/listBlogs", 200, r#"{"data":"nope"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "could not parse response from /api/listBlogs");
    }
}
