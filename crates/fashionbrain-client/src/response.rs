//! Turning a received HTTP response into a request outcome.
//!
//! Everything here is pure: the transport layer hands over the status, the
//! raw body text and (for POSTs) the JSON body that was sent.

use fashionbrain_core::{FashionBrainError, Result};
use reqwest::StatusCode;
use serde_json::{json, Map, Value};

use crate::paths;

/// Substrings marking a signup rejection that is really a pending email
/// confirmation.
const CONFIRMATION_MARKERS: [&str; 2] = ["Email confirmation required", "check your email"];

/// Interpret a response body.
///
/// - success + JSON (or empty) body → the parsed value
/// - success + malformed body → [`FashionBrainError::Parse`]
/// - error + malformed body → [`FashionBrainError::Server`] with the status text
/// - error on the signup path with a confirmation message → synthesized success
/// - any other error → [`FashionBrainError::Server`] with the best message available
pub(crate) fn interpret(
    path: &str,
    status: StatusCode,
    text: &str,
    sent_body: Option<&Value>,
) -> Result<Value> {
    let parsed = parse_body(text);

    if status.is_success() {
        return parsed.map_err(|err| FashionBrainError::parse(err.to_string()));
    }

    let fallback = format!("API error: {}", status_text(status));
    let body = match parsed {
        Ok(body) => body,
        Err(_) => return Err(FashionBrainError::server(status.as_u16(), fallback)),
    };

    let message = error_message(&body).unwrap_or(fallback);

    if is_signup_path(path) && is_confirmation_message(&message) {
        return Ok(confirmation_outcome(&message, sent_body));
    }

    Err(FashionBrainError::server(status.as_u16(), message))
}

/// Parse a body as JSON; an empty body is an empty object.
pub(crate) fn parse_body(text: &str) -> serde_json::Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(text)
}

/// Pick the server's own error message: `detail` first, then `message`.
///
/// A non-string `detail` (validation errors come back as a list) is
/// rendered as compact JSON.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    ["detail", "message"].iter().find_map(|key| match body.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    })
}

fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Status")
}

fn is_signup_path(path: &str) -> bool {
    path.split('?').next() == Some(paths::SIGNUP)
}

fn is_confirmation_message(message: &str) -> bool {
    CONFIRMATION_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Build the success value returned in place of a confirmation-required
/// signup failure.
fn confirmation_outcome(message: &str, sent_body: Option<&Value>) -> Value {
    let field = |key: &str| {
        sent_body
            .and_then(|body| body.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let email = field("email").unwrap_or_default();
    let name = field("name")
        .map(str::to_string)
        .unwrap_or_else(|| email_local_part(email).to_string());

    json!({
        "success": true,
        "requires_confirmation": true,
        "message": message,
        "user": {
            "id": "pending",
            "email": email,
            "name": name,
        }
    })
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
