//! In-band response classification.
//!
//! The backend answers HTTP 200 for failures too; the only signal is a
//! truthy `error_code` field in the body. These functions decide which side
//! of that line a decoded body falls on.

use serde_json::Value;

use crate::error::{ApiError, ErrorObject};

/// True when `value` is an object carrying a truthy `error_code`.
///
/// Empty strings, `0`, `false` and `null` do not count.
pub fn is_error_response(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.get("error_code").is_some_and(is_truthy),
        _ => false,
    }
}

/// True when `value` is a usable resource: an object or a list that is not
/// an error. Bare numbers, strings, booleans and `null` are never success.
pub fn is_success_response(value: &Value) -> bool {
    match value {
        Value::Object(_) => !is_error_response(value),
        Value::Array(_) => true,
        _ => false,
    }
}

pub fn make_error(code: &str, message: &str) -> ErrorObject {
    ErrorObject {
        error_code: code.to_string(),
        error_message: message.to_string(),
    }
}

/// Turn a decoded body into the value a caller receives.
pub fn classify(value: Value) -> Result<Value, ApiError> {
    if is_success_response(&value) {
        return Ok(value);
    }
    match to_error_object(&value) {
        Some(err) => Err(ApiError::Backend(err)),
        None => Err(ApiError::UnexpectedResponse(value)),
    }
}

/// Extract the error body from an error-shaped value. Non-string codes are
/// rendered as their JSON text so a numeric code still round-trips.
pub fn to_error_object(value: &Value) -> Option<ErrorObject> {
    if !is_error_response(value) {
        return None;
    }
    let code = match &value["error_code"] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let message = match &value["error_message"] {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    Some(make_error(&code, &message))
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn truthy_error_code_is_an_error() {
        assert!(is_error_response(&json!({"error_code": "no-user"})));
        assert!(is_error_response(&json!({"error_code": -40, "error_message": "x"})));
        assert!(is_error_response(&json!({"error_code": "e", "idx": "3"})));
    }

    #[test]
    fn falsy_or_missing_error_code_is_not_an_error() {
        for value in [
            json!({"error_code": ""}),
            json!({"error_code": 0}),
            json!({"error_code": null}),
            json!({"error_code": false}),
            json!({}),
            json!(null),
            json!(42),
            json!("x"),
            json!(["error_code"]),
        ] {
            assert!(!is_error_response(&value), "{value} must not be an error");
        }
    }

    #[test]
    fn success_requires_non_error_object() {
        assert!(is_success_response(&json!({"idx": "1"})));
        assert!(is_success_response(&json!({})));
        assert!(is_success_response(&json!({"error_code": ""})));
        assert!(is_success_response(&json!([1, 2])));
        assert!(!is_success_response(&json!(null)));
        assert!(!is_success_response(&json!(42)));
        assert!(!is_success_response(&json!("s")));
        assert!(!is_success_response(&json!(true)));
        assert!(!is_success_response(&json!({"error_code": "x"})));
    }

    #[test]
    fn make_error_builds_canonical_body() {
        let err = make_error("no-backend-url", "missing");
        assert_eq!(err.error_code, "no-backend-url");
        assert_eq!(err.error_message, "missing");
    }

    #[test]
    fn classify_passes_success_through() {
        let body = json!({"idx": "7", "title": "hello"});
        assert_eq!(classify(body.clone()).unwrap(), body);
    }

    #[test]
    fn classify_turns_error_body_into_backend_error() {
        let err = classify(json!({"error_code": "wrong-password", "error_message": "nope"})).unwrap_err();
        match err {
            ApiError::Backend(obj) => {
                assert_eq!(obj.error_code, "wrong-password");
                assert_eq!(obj.error_message, "nope");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn classify_keeps_primitive_body_for_inspection() {
        let err = classify(json!(42)).unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedResponse(ref v) if *v == json!(42)));
    }

    #[test]
    fn numeric_error_code_is_stringified() {
        let obj = to_error_object(&json!({"error_code": -1})).unwrap();
        assert_eq!(obj.error_code, "-1");
        assert_eq!(obj.error_message, "");
    }
}
