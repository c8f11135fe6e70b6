use crate::userdb::{MailboxAddress, UserStore};
use axum::{
    Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct PasswordStatusRequest {
    email: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PasswordStatusResponse {
    email: String,
    password_initialized: bool,
    must_change_password: bool,
}

#[utoipa::path(
    post,
    path= "/api/check-password-status",
    request_body = PasswordStatusRequest,
    responses (
        (status = 200, description = "Mailbox password state", body = PasswordStatusResponse),
        (status = 400, description = "Missing or invalid email"),
        (status = 500, description = "User store query failed")
    ),
    tag = "password",
)]
/// Report whether a mailbox still runs on its admin-assigned password.
pub async fn check_password_status(
    Extension(store): Extension<Arc<UserStore>>,
    Json(request): Json<PasswordStatusRequest>,
) -> Response {
    let Some(email) = request.email.filter(|email| !email.is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Email required"})))
            .into_response();
    };

    let Some(mailbox) = MailboxAddress::parse(&email) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid email"}))).into_response();
    };

    match store.password_initialized(&mailbox).await {
        Ok(initialized) => Json(PasswordStatusResponse {
            email,
            password_initialized: initialized,
            must_change_password: !initialized,
        })
        .into_response(),
        Err(err) => {
            error!("Check status error: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to check status"})),
            )
                .into_response()
        }
    }
}
