use axum::{Json, extract::State};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::{
    AppState,
    error::ApiError,
    handlers,
    models::{
        admin::{CreateCustomerForm, CustomerReply, ResetPasswordForm},
        common::SubmissionReply,
    },
};

#[utoipa::path(
    post,
    path = "/admin/customers",
    tag = "admin",
    request_body = CreateCustomerForm,
    responses(
        (status = 200, description = "Customer created", body = CustomerReply),
        (status = 400, description = "Missing fields or provider rejection", body = crate::models::common::ErrorMessage),
        (status = 403, description = "Caller is not on the admin allow-list", body = crate::models::common::ErrorMessage),
        (status = 500, description = "Configuration or provider error", body = crate::models::common::ErrorMessage)
    )
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<JsonValue>,
) -> Result<Json<CustomerReply>, ApiError> {
    let form: CreateCustomerForm = serde_json::from_value(payload)
        .map_err(|err| ApiError::Validation(format!("Invalid request body: {err}")))?;
    info!("Incoming create-customer request");
    let reply = handlers::admin::create_customer(&state, form).await?;
    Ok(Json(reply))
}

#[utoipa::path(
    post,
    path = "/admin/password-reset",
    tag = "admin",
    request_body = ResetPasswordForm,
    responses(
        (status = 200, description = "Password updated", body = SubmissionReply),
        (status = 400, description = "Missing fields or password too short", body = crate::models::common::ErrorMessage),
        (status = 403, description = "Caller is not on the admin allow-list", body = crate::models::common::ErrorMessage),
        (status = 404, description = "No user with that email", body = crate::models::common::ErrorMessage),
        (status = 500, description = "Configuration or provider error", body = crate::models::common::ErrorMessage)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<JsonValue>,
) -> Result<Json<SubmissionReply>, ApiError> {
    let form: ResetPasswordForm = serde_json::from_value(payload)
        .map_err(|err| ApiError::Validation(format!("Invalid request body: {err}")))?;
    info!("Incoming password-reset request");
    let reply = handlers::admin::reset_password(&state, form).await?;
    Ok(Json(reply))
}
