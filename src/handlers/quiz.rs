use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::json;

use crate::{
    AppState,
    error::ApiError,
    flow::Pipeline,
    models::{common::SubmissionReply, forms::QuizForm},
    services::marketing::ContactSync,
};

/// Quiz submission: the contact sync is the primary call; the spreadsheet
/// row and the result tag ride along best-effort.
pub async fn submit(state: &AppState, form: QuizForm) -> Result<SubmissionReply, ApiError> {
    let submission = form.validated()?;
    let marketing = state
        .marketing
        .as_ref()
        .ok_or(ApiError::Configuration)?
        .clone();

    let mut attributes = BTreeMap::new();
    attributes.insert("QUIZ_TYPE".to_string(), json!(&submission.quiz_type));
    if let Some(result) = &submission.result {
        attributes.insert("QUIZ_RESULT".to_string(), json!(result));
    }

    let sync = ContactSync {
        email: submission.email.clone(),
        first_name: Some(submission.firstname.clone()),
        attributes,
        list: Some(state.cfg.newsletter_list_id.clone()),
    };

    let mut pipeline = Pipeline::new("quiz");

    if let Some(sheets) = state.sheets.clone() {
        let row = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "firstname": &submission.firstname,
            "email": &submission.email,
            "quizType": &submission.quiz_type,
            "answers": &submission.answers,
            "result": &submission.result,
        });
        pipeline = pipeline.best_effort("sheets-log", move |_contact| async move {
            sheets.append(&row).await
        });
    }

    if let Some(result) = submission.result.clone() {
        let tagger = marketing.clone();
        let tag = format!("quiz:{result}");
        pipeline = pipeline.best_effort("result-tag", move |contact| async move {
            tagger.apply_tag(&contact, &tag).await
        });
    }

    let contact = pipeline.run(marketing.sync_contact(&sync)).await?;

    Ok(SubmissionReply::for_outcome(
        contact.outcome,
        "Successfully subscribed!",
        "Already subscribed!",
    ))
}
