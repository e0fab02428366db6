// src/error.rs

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Message used when a failed request carried no response body at all.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Error, Debug)]
pub enum PayrollError {
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("Session missing or expired (Status 401)")]
    Unauthorized,

    // Non-401 API errors. `detail` is the backend's `detail` field when it had one.
    #[error("PayrollEdge API error: Status={status}, Message='{message}'")]
    ApiError {
        status: StatusCode,
        message: String,
        detail: Option<String>,
    },

    #[error("Invalid payroll period: month={month}, year={year}")]
    InvalidPeriod { month: u32, year: i32 },

    #[error("Action not allowed: {0}")]
    ActionNotAllowed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV error")]
    Csv(#[from] csv::Error),
}

impl PayrollError {
    /// The backend-provided detail if there is one, otherwise `fallback`.
    pub fn detail_or(&self, fallback: &str) -> String {
        match self {
            PayrollError::ApiError {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PayrollError::ApiError { status, .. } => Some(*status),
            PayrollError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            PayrollError::Request(e) => e.status(),
            _ => None,
        }
    }
}

// Helper to create context-aware IO errors
pub(crate) fn io_context<E: Into<std::io::Error>, S: Into<String>>(
    source: E,
    context: S,
) -> PayrollError {
    PayrollError::Io {
        source: source.into(),
        context: context.into(),
    }
}

/// Pulls a human readable message out of a backend error body.
///
/// The backend reports errors as `{"detail": ...}` where `detail` is either a
/// plain string, a list of validation errors (`[{"msg": ..}, ..]`), or an
/// object carrying a `msg`.
pub fn extract_detail(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item.get("msg").and_then(Value::as_str) {
                    Some(msg) => msg.to_string(),
                    None => item.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(map) => map.get("msg").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Message for a failed response body: the detail when present, the raw body
/// otherwise, and [`GENERIC_ERROR_MESSAGE`] when there was nothing to read.
pub fn error_message(body: Option<&str>) -> String {
    let body = match body.map(str::trim) {
        Some(b) if !b.is_empty() => b,
        _ => return GENERIC_ERROR_MESSAGE.to_string(),
    };
    match serde_json::from_str::<Value>(body) {
        Ok(value) => extract_detail(&value).unwrap_or_else(|| value.to_string()),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_detail_string() {
        let body = json!({ "detail": "No paid payroll records found" });
        assert_eq!(
            extract_detail(&body).as_deref(),
            Some("No paid payroll records found")
        );
    }

    #[test]
    fn test_extract_detail_validation_list() {
        let body = json!({
            "detail": [
                { "loc": ["body", "month"], "msg": "field required" },
                { "loc": ["body", "year"], "msg": "value is not a valid integer" },
                { "loc": ["query"] }
            ]
        });
        assert_eq!(
            extract_detail(&body).unwrap(),
            r#"field required, value is not a valid integer, {"loc":["query"]}"#
        );
    }

    #[test]
    fn test_extract_detail_nested_msg() {
        let body = json!({ "detail": { "msg": "Insufficient permissions" } });
        assert_eq!(
            extract_detail(&body).as_deref(),
            Some("Insufficient permissions")
        );
        assert_eq!(extract_detail(&json!({ "error": "x" })), None);
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message(None), GENERIC_ERROR_MESSAGE);
        assert_eq!(error_message(Some("  ")), GENERIC_ERROR_MESSAGE);
        assert_eq!(error_message(Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(error_message(Some(r#"{"error":"boom"}"#)), r#"{"error":"boom"}"#);
        assert_eq!(error_message(Some(r#"{"detail":"nope"}"#)), "nope");
    }

    #[test]
    fn test_detail_or() {
        let with_detail = PayrollError::ApiError {
            status: StatusCode::NOT_FOUND,
            message: "No approved payroll records found".to_string(),
            detail: Some("No approved payroll records found".to_string()),
        };
        assert_eq!(
            with_detail.detail_or("Failed to mark as paid"),
            "No approved payroll records found"
        );

        let without = PayrollError::ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal Server Error".to_string(),
            detail: None,
        };
        assert_eq!(without.detail_or("Failed to mark as paid"), "Failed to mark as paid");
        assert_eq!(
            PayrollError::Unauthorized.detail_or("fallback"),
            "fallback"
        );
    }
}
