use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::ValidationError;
use super::mode::ModeKind;

/// User-facing error taxonomy. Every entry is recoverable from the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Connection,
    Auth,
    Permission,
    NotFound,
    RateLimit,
    Server,
    Unavailable,
    ResponseFormat,
    GenericRequest,
}

/// Classified failure shown to the user as `title: detail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub title: String,
    pub detail: String,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            detail: detail.into(),
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.detail)
    }
}

impl From<&ValidationError> for ClassifiedError {
    fn from(error: &ValidationError) -> Self {
        Self::new(ErrorKind::Validation, "Invalid Application", error.to_string())
    }
}

/// Attempt details the classifier may quote back to the user.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationContext<'a> {
    pub mode: ModeKind,
    pub url: &'a str,
    pub status_text: &'a str,
}

/// Maps a transport outcome to the error taxonomy.
///
/// `status` is `None` when no response arrived at all; `raw_error` carries the
/// transport message in that case, or the JSON parse error when a response
/// arrived but its body could not be decoded.
pub fn classify(
    status: Option<u16>,
    body: Option<&Value>,
    raw_error: Option<&str>,
    context: &ClassificationContext<'_>,
) -> ClassifiedError {
    let Some(status) = status else {
        return connection_failed(context);
    };

    if let Some(parse_error) = raw_error {
        return ClassifiedError::new(
            ErrorKind::ResponseFormat,
            "Invalid Response",
            format!("Invalid response format from server. Expected JSON ({parse_error})."),
        );
    }

    let body_detail = body.and_then(detail_from_body);
    let or_generic = |generic: &str| body_detail.clone().unwrap_or_else(|| generic.to_string());

    match status {
        401 => ClassifiedError::new(
            ErrorKind::Auth,
            "Authentication Failed",
            "Your access token is invalid or expired. Update PORTAL_GATEWAY_TOKEN in your configuration.",
        ),
        403 => ClassifiedError::new(
            ErrorKind::Permission,
            "Access Forbidden",
            or_generic("You do not have permission to access this API."),
        ),
        404 => ClassifiedError::new(
            ErrorKind::NotFound,
            "Not Found",
            format!(
                "The endpoint {} was not found. Check your configuration.",
                context.url
            ),
        ),
        429 => ClassifiedError::new(
            ErrorKind::RateLimit,
            "Rate Limited",
            or_generic("Too many requests. Please wait a moment and try again."),
        ),
        500 => ClassifiedError::new(
            ErrorKind::Server,
            "Server Error",
            or_generic("The server encountered an internal error. Check backend logs."),
        ),
        502..=504 => ClassifiedError::new(
            ErrorKind::Unavailable,
            "Service Unavailable",
            or_generic("The backend service is temporarily unavailable. Please try again later."),
        ),
        other => ClassifiedError::new(
            ErrorKind::GenericRequest,
            format!("Request Failed ({other})"),
            body_detail
                .clone()
                .unwrap_or_else(|| status_phrase(other, context.status_text)),
        ),
    }
}

fn connection_failed(context: &ClassificationContext<'_>) -> ClassifiedError {
    let hint = match context.mode {
        ModeKind::GatewayFronted => {
            "Unable to reach the API. Please ensure the service is running and that its HTTPS certificate is trusted."
                .to_string()
        }
        ModeKind::DirectIntegrator => format!(
            "Unable to reach the API. Please ensure the service is running on {}.",
            context.url
        ),
    };
    ClassifiedError::new(ErrorKind::Connection, "Connection Failed", hint)
}

/// First non-empty `message`, `error`, or `description` field.
fn detail_from_body(body: &Value) -> Option<String> {
    ["message", "error", "description"]
        .iter()
        .filter_map(|field| body.get(field))
        .find_map(|value| match value {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Null | Value::String(_) => None,
            other => Some(other.to_string()),
        })
}

fn status_phrase(status: u16, status_text: &str) -> String {
    if status_text.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        status_text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn direct_context() -> ClassificationContext<'static> {
        ClassificationContext {
            mode: ModeKind::DirectIntegrator,
            url: "http://localhost:9090/policy",
            status_text: "",
        }
    }

    #[test]
    fn body_fields_are_checked_in_priority_order() {
        let body = json!({"description": "third", "error": "second", "message": "first"});
        assert_eq!(detail_from_body(&body).as_deref(), Some("first"));

        let body = json!({"description": "third", "error": "second"});
        assert_eq!(detail_from_body(&body).as_deref(), Some("second"));

        let body = json!({"message": "", "description": "third"});
        assert_eq!(detail_from_body(&body).as_deref(), Some("third"));

        assert_eq!(detail_from_body(&json!({"code": 42})), None);
    }

    #[test]
    fn unknown_status_without_text_still_has_detail() {
        let error = classify(Some(418), None, None, &direct_context());
        assert_eq!(error.title, "Request Failed (418)");
        assert_eq!(error.detail, "HTTP 418");
    }

    #[test]
    fn display_joins_title_and_detail() {
        let error = classify(Some(500), Some(&json!({"error": "boom"})), None, &direct_context());
        assert_eq!(error.message(), "Server Error: boom");
    }
}
