//! Uniform response envelope
//!
//! `success == true` ⇒ no error fields; `success == false` ⇒ no data.
//! Fields are private so every envelope goes through a constructor that
//! upholds this.

use crate::error::OrchestrationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Answer used when the agent produced nothing
pub const NO_ANSWER_PLACEHOLDER: &str = "응답을 처리할 수 없습니다.";

const DEFAULT_ERROR_CODE: &str = "INTERNAL_SERVER_ERROR";
const DEFAULT_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawEnvelope")]
pub struct ResponseEnvelope {
    success: bool,
    data: Option<Value>,
    error_code: Option<String>,
    error_message: Option<String>,
}

/// Wire shape checked before it becomes a `ResponseEnvelope`
#[derive(Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

impl TryFrom<RawEnvelope> for ResponseEnvelope {
    type Error = String;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        match (raw.success, raw.data, raw.error_code, raw.error_message) {
            (true, data, None, None) => Ok(Self::from_parts(true, data, None, None)),
            (true, ..) => Err("successful envelope must not carry error fields".to_string()),
            (false, None, Some(code), Some(message)) => Ok(Self::failure(code, message)),
            (false, Some(_), ..) => Err("failed envelope must not carry data".to_string()),
            (false, ..) => Err("failed envelope needs error_code and error_message".to_string()),
        }
    }
}

impl ResponseEnvelope {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_code: None,
            error_message: None,
        }
    }

    pub fn failure(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
        }
    }

    pub fn from_error(error: &OrchestrationError) -> Self {
        Self::failure(error.error_code(), error.to_string())
    }

    /// Build from loose parts, dropping whichever side the flag rules out.
    /// A failure with no code or message gets generic ones.
    pub fn from_parts(
        ok: bool,
        data: Option<Value>,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Self {
        if ok {
            Self {
                success: true,
                data,
                error_code: None,
                error_message: None,
            }
        } else {
            Self::failure(
                error_code.unwrap_or_else(|| DEFAULT_ERROR_CODE.to_string()),
                error_message.unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            )
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

impl<T: Serialize> From<crate::Result<T>> for ResponseEnvelope {
    fn from(result: crate::Result<T>) -> Self {
        match result.and_then(|data| serde_json::to_value(data).map_err(Into::into)) {
            Ok(data) => Self::success(data),
            Err(e) => Self::from_error(&e),
        }
    }
}

/// Pull a display answer out of whatever the agent returned. Total.
///
/// - string → verbatim
/// - object with a non-empty `messages` list → content of the last message
/// - any other value → its compact JSON rendering
/// - nothing → the placeholder
pub fn extract_answer(result: Option<&Value>) -> String {
    match result {
        None | Some(Value::Null) => NO_ANSWER_PLACEHOLDER.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(value) => last_message_content(value).unwrap_or_else(|| value.to_string()),
    }
}

fn last_message_content(value: &Value) -> Option<String> {
    let last = value.get("messages")?.as_array()?.last()?;
    match last {
        Value::String(text) => Some(text.clone()),
        message => match message.get("content")? {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn holds_invariant(envelope: &ResponseEnvelope) -> bool {
        let has_error = envelope.error_code().is_some() && envelope.error_message().is_some();
        let no_error = envelope.error_code().is_none() && envelope.error_message().is_none();
        if envelope.is_success() {
            no_error
        } else {
            has_error && envelope.data().is_none()
        }
    }

    #[test]
    fn test_envelope_invariant_for_all_part_combinations() {
        let datas = [None, Some(json!({"k": 1}))];
        let codes = [None, Some("E".to_string())];
        let messages = [None, Some("boom".to_string())];

        for ok in [true, false] {
            for data in &datas {
                for code in &codes {
                    for message in &messages {
                        let envelope = ResponseEnvelope::from_parts(
                            ok,
                            data.clone(),
                            code.clone(),
                            message.clone(),
                        );
                        assert!(holds_invariant(&envelope), "{envelope:?}");
                        assert_eq!(envelope.is_success(), ok);
                    }
                }
            }
        }
    }

    #[test]
    fn test_from_error_uses_error_code() {
        let envelope =
            ResponseEnvelope::from_error(&OrchestrationError::UnsupportedIntent("unknown".into()));
        assert!(!envelope.is_success());
        assert_eq!(envelope.error_code(), Some("UNSUPPORTED_INTENT"));
        assert!(envelope.error_message().unwrap().contains("unknown"));
    }

    #[test]
    fn test_from_result() {
        let ok: crate::Result<Value> = Ok(json!({"report": "ok"}));
        let envelope = ResponseEnvelope::from(ok);
        assert_eq!(envelope.data(), Some(&json!({"report": "ok"})));

        let err: crate::Result<Value> = Err(OrchestrationError::MissingParameter("stock_code".into()));
        let envelope = ResponseEnvelope::from(err);
        assert_eq!(envelope.error_code(), Some("MISSING_PARAMETER"));
    }

    #[test]
    fn test_serialized_shape() {
        let envelope = ResponseEnvelope::failure("TEST_ERROR", "Test error message");
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": false,
                "data": null,
                "error_code": "TEST_ERROR",
                "error_message": "Test error message",
            })
        );
    }

    #[test]
    fn test_deserialize_enforces_invariant() {
        let rejected = [
            json!({"success": true, "data": {"x": 1}, "error_code": "E", "error_message": "boom"}),
            json!({"success": true, "data": null, "error_code": null, "error_message": "boom"}),
            json!({"success": false, "data": {"x": 1}, "error_code": "E", "error_message": "boom"}),
            json!({"success": false, "data": null, "error_code": "E", "error_message": null}),
        ];
        for value in rejected {
            assert!(
                serde_json::from_value::<ResponseEnvelope>(value.clone()).is_err(),
                "{value}"
            );
        }

        let ok: ResponseEnvelope =
            serde_json::from_value(json!({"success": true, "data": {"x": 1}})).unwrap();
        assert_eq!(ok, ResponseEnvelope::success(json!({"x": 1})));

        let failure = ResponseEnvelope::failure("TIMEOUT", "Timed out");
        let parsed: ResponseEnvelope =
            serde_json::from_value(serde_json::to_value(&failure).unwrap()).unwrap();
        assert_eq!(parsed, failure);
    }

    #[test]
    fn test_extract_answer_totality() {
        assert_eq!(extract_answer(Some(&json!("hello"))), "hello");
        assert_eq!(
            extract_answer(Some(&json!({"messages": [{"content": "A"}, {"content": "B"}]}))),
            "B"
        );

        let rendered = extract_answer(Some(&json!({"foo": "bar"})));
        assert!(rendered.contains("foo") && rendered.contains("bar"));

        assert_eq!(extract_answer(None), NO_ANSWER_PLACEHOLDER);
        assert_eq!(extract_answer(Some(&Value::Null)), NO_ANSWER_PLACEHOLDER);
    }

    #[test]
    fn test_extract_answer_odd_shapes() {
        // empty message list falls back to rendering
        let rendered = extract_answer(Some(&json!({"messages": []})));
        assert_eq!(rendered, r#"{"messages":[]}"#);

        // message without content falls back to rendering
        let rendered = extract_answer(Some(&json!({"messages": [{"role": "ai"}]})));
        assert!(rendered.contains("role"));

        assert_eq!(extract_answer(Some(&json!({"messages": ["plain"]}))), "plain");
        assert_eq!(extract_answer(Some(&json!(42))), "42");
        assert_eq!(
            extract_answer(Some(&json!({"messages": [{"content": [1, 2]}]}))),
            "[1,2]"
        );
    }

    #[test]
    fn test_extract_answer_is_deterministic() {
        let value = json!({"confidence": 0.85, "analysis": "시장 분석 데이터"});
        assert_eq!(extract_answer(Some(&value)), extract_answer(Some(&value)));
    }
}
