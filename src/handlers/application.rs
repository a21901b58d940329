use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::json;

use crate::{
    AppState,
    config::Config,
    error::ApiError,
    flow::Pipeline,
    models::{
        common::SubmissionReply,
        forms::{ApplicationForm, ApplicationSubmission},
    },
    services::email::{EmailParty, TransactionalEmail},
    services::marketing::ContactSync,
};

const BUSINESS_FALLBACK: &str = "Not specified";

/// Application form: the contact sync onto the applications list is the
/// primary call; the spreadsheet row, the owner notification and the
/// applicant confirmation are all best-effort.
pub async fn submit(state: &AppState, form: ApplicationForm) -> Result<SubmissionReply, ApiError> {
    let submission = form.validated()?;
    let marketing = state.marketing.as_ref().ok_or(ApiError::Configuration)?;
    let business = submission
        .business
        .clone()
        .unwrap_or_else(|| BUSINESS_FALLBACK.to_string());

    let mut attributes = BTreeMap::new();
    attributes.insert("OFFER_INTEREST".to_string(), json!(&submission.offer));
    attributes.insert("CHALLENGE".to_string(), json!(&submission.challenge));
    attributes.insert("BUSINESS".to_string(), json!(&business));

    let sync = ContactSync {
        email: submission.email.clone(),
        first_name: Some(submission.firstname.clone()),
        attributes,
        list: Some(state.cfg.application_list_id.clone()),
    };

    let mut pipeline = Pipeline::new("application");

    if let Some(sheets) = state.sheets.clone() {
        let row = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "firstname": &submission.firstname,
            "email": &submission.email,
            "offer": &submission.offer,
            "challenge": &submission.challenge,
            "business": &business,
            "source": "Offers page application",
        });
        pipeline = pipeline.best_effort("sheets-log", move |_contact| async move {
            sheets.append(&row).await
        });
    }

    if let Some(email) = state.email.clone() {
        if let Some(notification) = owner_notification(&state.cfg, &submission) {
            let sender = email.clone();
            pipeline = pipeline.best_effort("owner-notification", move |_contact| async move {
                sender.send(&notification).await
            });
        }
        if let Some(confirmation) = applicant_confirmation(&state.cfg, &submission) {
            pipeline = pipeline.best_effort("applicant-confirmation", move |_contact| async move {
                email.send(&confirmation).await
            });
        }
    }

    let contact = pipeline.run(marketing.sync_contact(&sync)).await?;

    Ok(SubmissionReply::for_outcome(
        contact.outcome,
        "Application submitted successfully!",
        "Application submitted successfully!",
    ))
}

/// Heads-up mail to the site owner. None when no recipient is configured.
fn owner_notification(cfg: &Config, submission: &ApplicationSubmission) -> Option<TransactionalEmail> {
    let from_email = cfg.notify_from_email.clone()?;
    let to_email = cfg.notify_to_email.clone()?;
    let business = submission.business.as_deref().unwrap_or(BUSINESS_FALLBACK);

    Some(TransactionalEmail {
        sender: EmailParty {
            name: cfg.notify_from_name.clone(),
            email: from_email,
        },
        to: EmailParty {
            name: cfg.notify_to_name.clone(),
            email: to_email,
        },
        subject: format!(
            "🎯 New application: {} - {}",
            submission.offer, submission.firstname
        ),
        html: format!(
            "<h2>New application received!</h2>\n\
             <p><strong>Name:</strong> {}</p>\n\
             <p><strong>Email:</strong> {}</p>\n\
             <p><strong>Interested in:</strong> {}</p>\n\
             <h3>Biggest challenge:</h3>\n\
             <p>{}</p>\n\
             <h3>Business description:</h3>\n\
             <p>{}</p>\n\
             <hr>\n\
             <p><em>Received at: {}</em></p>",
            submission.firstname,
            submission.email,
            submission.offer,
            submission.challenge,
            business,
            Utc::now().format("%Y-%m-%d %H:%M UTC"),
        ),
    })
}

/// Confirmation mail back to the applicant. None when no sender address is
/// configured.
fn applicant_confirmation(
    cfg: &Config,
    submission: &ApplicationSubmission,
) -> Option<TransactionalEmail> {
    let from_email = cfg.notify_from_email.clone()?;

    Some(TransactionalEmail {
        sender: EmailParty {
            name: cfg.notify_from_name.clone(),
            email: from_email,
        },
        to: EmailParty {
            name: submission.firstname.clone(),
            email: submission.email.clone(),
        },
        subject: format!("Thanks for your application, {}!", submission.firstname),
        html: format!(
            "<div style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 40px 20px;\">\n\
             <h1>Hey {}! 👋</h1>\n\
             <p>Thanks for applying!</p>\n\
             <p>I received your message and will get back to you <strong>within 48 hours</strong>.</p>\n\
             <p>What happens next:</p>\n\
             <ol>\n\
             <li>I review your application</li>\n\
             <li>I get back to you by email</li>\n\
             <li>We schedule a short call (15-20 min)</li>\n\
             <li>We find out together whether and how I can help</li>\n\
             </ol>\n\
             <p>No sales pressure. Just clarity.</p>\n\
             <p>Talk soon!</p>\n\
             <hr>\n\
             <p>P.S. If you have any questions, just reply to this email.</p>\n\
             </div>",
            submission.firstname,
        ),
    })
}
