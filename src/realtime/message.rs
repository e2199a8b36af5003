//! Inbound stream payloads.

use std::borrow::Cow;

use enum_as_inner::EnumAsInner;
use serde_json::Value;
use snafu::prelude::*;

/// `type` of the payload announcing a new resume upload
pub static RESUME_UPLOADED: &str = "resume_uploaded";

/// Filename shown when an upload payload does not carry one
pub static PLACEHOLDER_FILENAME: &str = "file";

/// Error when parse payload as json
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum ParseMessageError {
    /// payload is invalid json even after quote normalization
    #[snafu(display("parse json {normalized:?} failed: {source}"))]
    ParseJSONFailed {
        /// text handed to the json parser
        normalized: String,
        /// source error
        source: serde_json::Error,
    },
}

/// Turn every single quote into a double quote.
///
/// Lets through payloads written with python style quoting like
/// `{'type': 'resume_uploaded'}`. This is a heuristic, not a parser: an
/// apostrophe inside a value (`O'Brien.pdf`) is rewritten too and breaks the
/// payload, which then degrades to plain text.
pub fn normalize_quotes(raw: &str) -> Cow<'_, str> {
    if raw.contains('\'') {
        Cow::Owned(raw.replace('\'', "\""))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Parse payload as json after [`normalize_quotes`]
pub fn parse_payload(raw: &str) -> Result<Value, ParseMessageError> {
    let normalized = normalize_quotes(raw);
    serde_json::from_str(&normalized).with_context(|_| error::ParseJSONFailed {
        normalized: &*normalized,
    })
}

/// A payload received on the update stream
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum InboundEvent {
    /// a resume was uploaded, with the file name if the server sent a non empty one
    ResumeUploaded(Option<String>),
    /// any other structured payload
    Update(Value),
    /// payload that is not structured data
    Text(String),
}

impl InboundEvent {
    /// Classify a raw payload, never fails
    pub fn decode(raw: &str) -> Self {
        match parse_payload(raw) {
            Ok(Value::Null) => Self::Text(raw.to_string()),
            Ok(value) => Self::from_value(value),
            Err(err) => {
                log::debug!("Payload is not structured, treat as text: {}", err);
                Self::Text(raw.to_string())
            }
        }
    }

    fn from_value(value: Value) -> Self {
        if value.get("type").and_then(Value::as_str) == Some(RESUME_UPLOADED) {
            let filename = value.get("filename").and_then(display_text);
            Self::ResumeUploaded(filename)
        } else {
            Self::Update(value)
        }
    }

    /// Text of the notification shown for this event
    pub fn notification(&self) -> String {
        match self {
            Self::ResumeUploaded(filename) => format!(
                "New resume uploaded: {}",
                filename.as_deref().unwrap_or(PLACEHOLDER_FILENAME)
            ),
            Self::Update(value) => format!(
                "Real-time update: {}",
                value
                    .get("update")
                    .and_then(display_text)
                    .unwrap_or_else(|| value.to_string())
            ),
            Self::Text(raw) => format!("Real-time update received: {}", raw),
        }
    }
}

/// Render a json value as display text, `None` for values that read as empty
/// (`null`, `false`, `0`, `""`).
fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_resume_uploaded() {
        let event = InboundEvent::decode(r#"{"type": "resume_uploaded", "filename": "resume.pdf"}"#);

        assert_eq!(
            event,
            InboundEvent::ResumeUploaded(Some("resume.pdf".to_string()))
        );
        assert_eq!(event.notification(), "New resume uploaded: resume.pdf");
    }

    #[test]
    fn test_decode_single_quoted() {
        let event = InboundEvent::decode("{'type': 'resume_uploaded', 'filename': 'r.pdf'}");

        assert_eq!(
            event.into_resume_uploaded().unwrap(),
            Some("r.pdf".to_string())
        );
    }

    #[test]
    fn test_upload_without_filename_uses_placeholder() {
        let event = InboundEvent::decode(r#"{"type": "resume_uploaded", "filename": ""}"#);

        assert_eq!(event, InboundEvent::ResumeUploaded(None));
        assert_eq!(event.notification(), "New resume uploaded: file");
    }

    #[test]
    fn test_update_field_is_preferred() {
        let event = InboundEvent::decode(r#"{"update": "queue length 3"}"#);

        assert!(event.as_update().is_some());
        assert_eq!(event.notification(), "Real-time update: queue length 3");
    }

    #[test]
    fn test_other_payload_rendered_as_json() {
        let event = InboundEvent::decode(r#"{"type": "score_changed", "score": 87}"#);

        assert_eq!(
            event,
            InboundEvent::Update(json!({"type": "score_changed", "score": 87}))
        );
        assert_eq!(
            event.notification(),
            r#"Real-time update: {"score":87,"type":"score_changed"}"#
        );
    }

    #[test]
    fn test_not_json_is_text() {
        let event = InboundEvent::decode("not json at all");

        assert_eq!(event, InboundEvent::Text("not json at all".to_string()));
        assert_eq!(
            event.notification(),
            "Real-time update received: not json at all"
        );
    }

    #[test]
    fn test_null_is_text() {
        assert!(InboundEvent::decode("null").into_text().is_ok());
    }

    #[test]
    fn test_apostrophe_in_value_breaks_payload() {
        let raw = r#"{"type": "resume_uploaded", "filename": "O'Brien.pdf"}"#;

        assert!(parse_payload(raw).is_err());
        assert_eq!(InboundEvent::decode(raw), InboundEvent::Text(raw.to_string()));
    }

    #[test]
    fn test_normalize_borrows_when_nothing_to_do() {
        assert!(matches!(normalize_quotes(r#"{"a": 1}"#), Cow::Borrowed(_)));
        assert_eq!(normalize_quotes("{'a': 'b'}"), r#"{"a": "b"}"#);
    }
}
