//! TableCRM API errors and their classification.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Fallback message when a failed response carries nothing readable.
const UNKNOWN_ERROR: &str = "unknown error";

/// Errors that can occur when talking to the TableCRM API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The access token was rejected (HTTP 401 or 403).
    #[error("access token is invalid or expired")]
    Unauthorized,

    /// No HTTP response was received.
    #[error("could not reach the server: {0}")]
    Connectivity(String),

    /// The backend rejected individual fields of the request.
    #[error("{}", render_problems(.0))]
    Validation(Vec<FieldProblem>),

    /// Any other failure the backend reported.
    #[error("{message}")]
    Remote {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        message: String,
    },
}

impl ApiError {
    /// Classify a non-success response.
    ///
    /// 401 and 403 are authentication failures regardless of the body. Otherwise
    /// a `detail` array becomes [`ApiError::Validation`], and everything else is
    /// [`ApiError::Remote`] carrying the body's `message`, a string `detail`, or
    /// the status line, in that order.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Self::Unauthorized;
        }

        let json = serde_json::from_str::<Value>(body).ok();
        let detail = json.as_ref().and_then(|v| v.get("detail"));

        if let Some(Value::Array(items)) = detail {
            let problems: Vec<FieldProblem> = items.iter().map(FieldProblem::from_value).collect();
            if !problems.is_empty() {
                return Self::Validation(problems);
            }
        }

        let message = json
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(non_empty_str)
            .or_else(|| detail.and_then(non_empty_str))
            .map(String::from)
            .or_else(|| {
                status
                    .canonical_reason()
                    .map(|reason| format!("{} {reason}", status.as_u16()))
            })
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string());

        Self::Remote {
            status: Some(status.as_u16()),
            message,
        }
    }

    /// Map a transport-level `reqwest` failure.
    ///
    /// Errors that happened after a response arrived (body decoding) are
    /// remote failures; the rest never produced a response.
    #[must_use]
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::Remote {
                status: error.status().map(|s| s.as_u16()),
                message: format!("unreadable response: {error}"),
            };
        }
        Self::Connectivity(error.to_string())
    }

    /// Whether this is an authentication failure.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// One entry of a backend validation `detail` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub message: String,
    /// Path to the offending field, e.g. `["body", 0, "goods"]`.
    pub location: Vec<String>,
}

impl FieldProblem {
    /// Field path joined with dots, `None` when the backend sent no location.
    #[must_use]
    pub fn field_path(&self) -> Option<String> {
        (!self.location.is_empty()).then(|| self.location.join("."))
    }

    fn from_value(value: &Value) -> Self {
        let message = match value.get("msg") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => UNKNOWN_ERROR.to_string(),
        };
        let location = value
            .get("loc")
            .and_then(Value::as_array)
            .map(|loc| loc.iter().map(render_location_part).collect())
            .unwrap_or_default();

        Self { message, location }
    }
}

fn render_location_part(part: &Value) -> String {
    match part {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

/// Render problems as `1. msg (field: a.b); 2. msg`.
fn render_problems(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .enumerate()
        .map(|(index, problem)| match problem.field_path() {
            Some(path) => format!("{}. {} (field: {path})", index + 1, problem.message),
            None => format!("{}. {}", index + 1, problem.message),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
