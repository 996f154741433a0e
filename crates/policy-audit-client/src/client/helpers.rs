//! Pure helpers: error body parsing and query literal escaping (no HTTP).

use reqwest::StatusCode;

use crate::types::{ApiErrorItem, AuthErrorBody};

/// Error message from a token endpoint failure.
///
/// Prefers `error_description`, then `error`, then the raw body, then the
/// status line.
pub(crate) fn auth_error_message(body: &str, status: StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<AuthErrorBody>(body) {
        if let Some(description) = parsed.error_description.filter(|s| !s.is_empty()) {
            return description;
        }
        if let Some(error) = parsed.error.filter(|s| !s.is_empty()) {
            return error;
        }
    }
    fallback_message(body, status)
}

/// Parsed REST API error: `(errorCode, message)`.
///
/// The API answers errors with `[{"message": "...", "errorCode": "..."}]`.
pub(crate) fn api_error(body: &str, status: StatusCode) -> (Option<String>, String) {
    if let Ok(items) = serde_json::from_str::<Vec<ApiErrorItem>>(body) {
        if let Some(first) = items.into_iter().next() {
            let message = first
                .message
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| fallback_message(body, status));
            return (first.error_code, message);
        }
    }
    (None, fallback_message(body, status))
}

fn fallback_message(body: &str, status: StatusCode) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        body.chars().take(200).collect()
    }
}

/// Escape a value for use inside a single-quoted query literal.
pub(crate) fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"authentication failure"}"#;
        assert_eq!(
            auth_error_message(body, StatusCode::BAD_REQUEST),
            "authentication failure"
        );
    }

    #[test]
    fn test_auth_error_fallbacks() {
        assert_eq!(
            auth_error_message(r#"{"error":"invalid_client_id"}"#, StatusCode::BAD_REQUEST),
            "invalid_client_id"
        );
        assert_eq!(
            auth_error_message("not json", StatusCode::BAD_REQUEST),
            "not json"
        );
        assert_eq!(
            auth_error_message("", StatusCode::UNAUTHORIZED),
            "HTTP 401"
        );
    }

    #[test]
    fn test_api_error_array() {
        let body = r#"[{"message":"unexpected token: FROM","errorCode":"MALFORMED_QUERY"}]"#;
        let (code, message) = api_error(body, StatusCode::BAD_REQUEST);
        assert_eq!(code.as_deref(), Some("MALFORMED_QUERY"));
        assert_eq!(message, "unexpected token: FROM");
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("O'Brien"), "O\\'Brien");
        assert_eq!(escape_literal(r"a\b"), r"a\\b");
        assert_eq!(escape_literal("plain"), "plain");
    }
}
