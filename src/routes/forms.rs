use axum::{Json, extract::State};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::{
    AppState,
    error::ApiError,
    handlers,
    models::common::SubmissionReply,
    models::forms::{ApplicationForm, NewsletterForm, QuizForm},
};

#[utoipa::path(
    post,
    path = "/forms/newsletter",
    tag = "forms",
    request_body = NewsletterForm,
    responses(
        (status = 200, description = "Subscribed (or already subscribed)", body = SubmissionReply),
        (status = 400, description = "Missing required fields", body = crate::models::common::ErrorMessage),
        (status = 500, description = "Configuration or provider error", body = crate::models::common::ErrorMessage)
    )
)]
pub async fn newsletter(
    State(state): State<AppState>,
    Json(payload): Json<JsonValue>,
) -> Result<Json<SubmissionReply>, ApiError> {
    let form = parse_form::<NewsletterForm>(payload)?;
    info!("Incoming newsletter signup");
    let reply = handlers::newsletter::submit(&state, form).await?;
    Ok(Json(reply))
}

#[utoipa::path(
    post,
    path = "/forms/quiz",
    tag = "forms",
    request_body = QuizForm,
    responses(
        (status = 200, description = "Submission stored", body = SubmissionReply),
        (status = 400, description = "Missing required fields", body = crate::models::common::ErrorMessage),
        (status = 500, description = "Configuration or provider error", body = crate::models::common::ErrorMessage)
    )
)]
pub async fn quiz(
    State(state): State<AppState>,
    Json(payload): Json<JsonValue>,
) -> Result<Json<SubmissionReply>, ApiError> {
    let form = parse_form::<QuizForm>(payload)?;
    info!(quiz_type = form.quiz_type.as_deref(), "Incoming quiz submission");
    let reply = handlers::quiz::submit(&state, form).await?;
    Ok(Json(reply))
}

#[utoipa::path(
    post,
    path = "/forms/application",
    tag = "forms",
    request_body = ApplicationForm,
    responses(
        (status = 200, description = "Application submitted", body = SubmissionReply),
        (status = 400, description = "Missing required fields", body = crate::models::common::ErrorMessage),
        (status = 500, description = "Configuration or provider error", body = crate::models::common::ErrorMessage)
    )
)]
pub async fn application(
    State(state): State<AppState>,
    Json(payload): Json<JsonValue>,
) -> Result<Json<SubmissionReply>, ApiError> {
    let form = parse_form::<ApplicationForm>(payload)?;
    info!(offer = form.offer.as_deref(), "Incoming application");
    let reply = handlers::application::submit(&state, form).await?;
    Ok(Json(reply))
}

/// Lift a loose JSON body into a form type. Field presence is checked by the
/// form's own validation so the 400 can name what is missing; this only
/// rejects bodies of the wrong shape.
fn parse_form<T: serde::de::DeserializeOwned>(payload: JsonValue) -> Result<T, ApiError> {
    serde_json::from_value(payload)
        .map_err(|err| ApiError::Validation(format!("Invalid request body: {err}")))
}
