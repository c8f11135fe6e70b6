use crate::{
    api::handlers::{optional_answer, script_response},
    provision::Provisioner,
};
use axum::{
    Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    domain: Option<String>,
    username: Option<String>,
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    age: Option<Value>,
    phone: Option<Value>,
}

#[utoipa::path(
    post,
    path= "/api/setup-silver-mail",
    request_body = SetupRequest,
    responses (
        (status = 200, description = "Setup script finished successfully"),
        (status = 400, description = "Missing required fields"),
        (status = 408, description = "Setup script exceeded its time limit"),
        (status = 500, description = "Setup script failed")
    ),
    tag = "provisioning",
)]
/// Run the initial Silver Mail provisioning script with the submitted answers.
pub async fn setup_silver_mail(
    Extension(provisioner): Extension<Arc<Provisioner>>,
    Json(request): Json<SetupRequest>,
) -> Response {
    let required = [
        request.domain.as_deref(),
        request.username.as_deref(),
        request.password.as_deref(),
        request.first_name.as_deref(),
        request.last_name.as_deref(),
    ];
    if required.iter().any(|field| field.is_none_or(str::is_empty)) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields"})),
        )
            .into_response();
    }

    let domain = request.domain.unwrap_or_default();
    info!("Starting Silver Mail setup for domain: {domain}");

    // Answer order matches the init.sh prompts.
    let answers = [
        domain,
        request.username.unwrap_or_default(),
        request.password.unwrap_or_default(),
        request.first_name.unwrap_or_default(),
        request.last_name.unwrap_or_default(),
        optional_answer(request.age.as_ref()),
        optional_answer(request.phone.as_ref()),
    ];

    match provisioner.run_setup(&answers).await {
        Ok(outcome) => script_response(
            &outcome,
            "Silver Mail setup completed successfully!",
            "Setup script failed",
            "Setup timeout - process took too long",
        ),
        Err(err) => {
            error!("Server error: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Internal server error: {err}")})),
            )
                .into_response()
        }
    }
}
