pub mod health;
pub mod setup;
pub mod status;
pub mod users;

use crate::provision::{ScriptOutcome, ScriptOutput};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{Value, json};

/// Blank line for absent optional answers so the script prompt still advances.
pub(crate) fn optional_answer(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Map a script outcome to the HTTP envelope shared by both provisioning
/// endpoints: exit 0 -> 200, non-zero -> 500 with both streams, timeout -> 408.
pub(crate) fn script_response(
    outcome: &ScriptOutcome,
    success_message: &str,
    failure_error: &str,
    timeout_error: &str,
) -> Response {
    match outcome {
        ScriptOutcome::Completed(output) if output.success() => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": success_message,
                "output": output.stdout,
            })),
        )
            .into_response(),
        ScriptOutcome::Completed(ScriptOutput {
            code,
            stdout,
            stderr,
        }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": failure_error,
                "code": code,
                "output": stdout,
                "errorOutput": stderr,
            })),
        )
            .into_response(),
        ScriptOutcome::TimedOut => (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({"error": timeout_error})),
        )
            .into_response(),
    }
}
