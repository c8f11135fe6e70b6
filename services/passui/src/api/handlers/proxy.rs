use crate::{
    thunder::ThunderClient,
    userdb::{MailboxAddress, UserStore},
};
use axum::{
    Extension,
    body::Bytes,
    extract::Path,
    http::{HeaderMap, Method, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Json, Response},
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::error;

// Thunder path whose success means the user rotated their password.
const UPDATE_CREDENTIALS_PATH: &str = "users/me/update-credentials";

/// Relay a browser request to the Thunder identity API.
///
/// The UI is served same-origin; this proxy exists so the browser never has to
/// negotiate CORS (or trust the mail host's self-signed certificate) with
/// Thunder directly. Status codes and JSON bodies pass through untouched, with
/// one side effect: a successful credential update marks the mailbox as
/// password-initialized in the user store.
pub async fn thunder(
    Extension(client): Extension<Arc<ThunderClient>>,
    Extension(store): Extension<Arc<UserStore>>,
    method: Method,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_body: Option<Value> = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => Some(value),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "Invalid JSON body"})),
                )
                    .into_response();
            }
        }
    };

    // GET requests carry no body upstream; everything else always sends JSON,
    // an absent body becoming `{}` so Thunder sees a parseable document.
    let upstream_body = if method == Method::GET {
        None
    } else {
        Some(
            request_body
                .clone()
                .unwrap_or_else(|| Value::Object(Map::new())),
        )
    };

    let upstream = match client
        .forward(
            method,
            &path,
            headers.get(AUTHORIZATION),
            upstream_body.as_ref(),
        )
        .await
    {
        Ok(response) => response,
        Err(err) => {
            error!("Proxy error: {err:#}");
            return proxy_failure(&err);
        }
    };

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);

    // 204 No Content or empty responses
    if status == StatusCode::NO_CONTENT || upstream.content_length() == Some(0) {
        finish_credential_update(&store, &path, status, request_body.as_ref()).await;
        return empty_upstream_response(status);
    }

    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("Proxy error: {err}");
            return proxy_failure(&anyhow::Error::from(err));
        }
    };

    if bytes.is_empty() {
        finish_credential_update(&store, &path, status, request_body.as_ref()).await;
        return empty_upstream_response(status);
    }

    let data: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            error!("Proxy error: invalid JSON from upstream: {err}");
            return proxy_failure(&anyhow::Error::from(err));
        }
    };

    finish_credential_update(&store, &path, status, request_body.as_ref()).await;

    (status, Json(data)).into_response()
}

fn empty_upstream_response(status: StatusCode) -> Response {
    if status == StatusCode::NO_CONTENT {
        // A 204 must not carry a body.
        return status.into_response();
    }

    (
        status,
        Json(json!({
            "success": true,
            "message": "Operation completed successfully"
        })),
    )
        .into_response()
}

fn proxy_failure(err: &anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Proxy request failed",
            "message": err.to_string(),
        })),
    )
        .into_response()
}

/// Mark the mailbox password-initialized after a successful credential update.
///
/// Failures are logged and never surfaced: the password change itself already
/// succeeded upstream.
async fn finish_credential_update(
    store: &UserStore,
    path: &str,
    status: StatusCode,
    request_body: Option<&Value>,
) {
    if path.trim_start_matches('/') != UPDATE_CREDENTIALS_PATH || !status.is_success() {
        return;
    }

    let Some(email) = request_body
        .and_then(|body| body.get("email"))
        .and_then(Value::as_str)
    else {
        return;
    };

    let Some(mailbox) = MailboxAddress::parse(email) else {
        error!("Update password_initialized skipped: invalid email");
        return;
    };

    if let Err(err) = store.mark_password_initialized(&mailbox).await {
        error!("Update password_initialized failed: {err}");
    }
}
