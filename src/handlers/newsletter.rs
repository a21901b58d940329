use std::collections::BTreeMap;

use crate::{
    AppState,
    error::ApiError,
    flow::Pipeline,
    models::{common::SubmissionReply, forms::NewsletterForm},
    services::marketing::ContactSync,
};

/// Newsletter signup: one primary call placing the contact on the
/// newsletter list. Resubmitting an address already on file succeeds.
pub async fn submit(state: &AppState, form: NewsletterForm) -> Result<SubmissionReply, ApiError> {
    let submission = form.validated()?;
    let marketing = state.marketing.as_ref().ok_or(ApiError::Configuration)?;

    let sync = ContactSync {
        email: submission.email,
        first_name: Some(submission.firstname),
        attributes: BTreeMap::new(),
        list: Some(state.cfg.newsletter_list_id.clone()),
    };

    let contact = Pipeline::new("newsletter")
        .run(marketing.sync_contact(&sync))
        .await?;

    Ok(SubmissionReply::for_outcome(
        contact.outcome,
        "Successfully subscribed!",
        "Already subscribed!",
    ))
}
