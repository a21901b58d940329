use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    AppState,
    error::ApiError,
    flow,
    markup::escape_markdown_v2,
    models::{booking::Booking, common::SubmissionReply},
};

/// Incoming booking webhook: build the notification text and send it. The
/// Telegram send is the primary (and only) call here.
pub async fn notify_webhook(state: &AppState, payload: Value) -> Result<SubmissionReply, ApiError> {
    let telegram = state.telegram.as_ref().ok_or(ApiError::Configuration)?;

    debug!(payload = %payload, "booking webhook received");
    let booking = Booking::from_loose(&payload);
    telegram.send_message(&notification_text(&booking)).await?;

    Ok(SubmissionReply::ok("Notification sent"))
}

/// Result of one booking-check run.
#[derive(Debug, Clone, Copy)]
pub struct CheckOutcome {
    pub total: usize,
    pub new: usize,
}

/// Scan the bookings feed for entries created after the persisted watermark
/// and notify each one. The feed fetch is the primary call; every
/// notification is best-effort; the watermark advances afterwards so a
/// redeploy does not replay old bookings.
pub async fn check(state: &AppState) -> Result<CheckOutcome, ApiError> {
    let tidycal = state.tidycal.as_ref().ok_or(ApiError::Configuration)?;
    let telegram = state.telegram.as_ref().ok_or(ApiError::Configuration)?;

    let records = tidycal.list_bookings().await?;
    let total = records.len();

    // First run has no mark yet; fall back to the recency window.
    let floor = match state.watermark.last_processed_at().await {
        Some(mark) => mark,
        None => Utc::now() - Duration::minutes(state.cfg.booking_window_minutes),
    };

    let mut new_bookings: Vec<Booking> = records
        .iter()
        .map(Booking::from_loose)
        .filter(|b| b.created_at.is_some_and(|created| created > floor))
        .collect();
    new_bookings.sort_by_key(|b| b.created_at);

    info!(total, new = new_bookings.len(), "booking check");

    for booking in &new_bookings {
        flow::best_effort(
            "booking-notification",
            telegram.send_message(&notification_text(booking)),
        )
        .await;
    }

    // Mark everything fetched as processed, whether or not it was new, so the
    // first run seeds the mark and later runs never renotify.
    let newest = records
        .iter()
        .filter_map(|r| Booking::from_loose(r).created_at)
        .max();
    if let Some(newest) = newest {
        if let Err(err) = state.watermark.advance(newest).await {
            warn!(error = %err, "failed to persist booking watermark");
        }
    }

    Ok(CheckOutcome {
        total,
        new: new_bookings.len(),
    })
}

/// MarkdownV2 notification body for one booking. Every provider-supplied
/// value goes through the escaper.
pub fn notification_text(booking: &Booking) -> String {
    let mut message = String::from("📅 *New booking\\!*\n\n");
    message.push_str(&format!("👤 *Name:* {}\n", escape_markdown_v2(&booking.name)));
    message.push_str(&format!(
        "📧 *Email:* {}\n",
        escape_markdown_v2(&booking.email)
    ));
    message.push_str(&format!(
        "🗓 *When:* {}\n",
        escape_markdown_v2(&booking.formatted_start())
    ));
    message.push_str(&format!(
        "📋 *Type:* {}\n",
        escape_markdown_v2(&booking.booking_type)
    ));

    if let Some(url) = &booking.meeting_url {
        message.push_str(&format!(
            "\n🔗 *Meeting link:*\n{}\n",
            escape_markdown_v2(url)
        ));
    }

    if let Some(notes) = &booking.notes {
        message.push_str(&format!("\n📝 *Notes:*\n{}\n", escape_markdown_v2(notes)));
    }

    if !booking.answers.is_empty() {
        message.push_str("\n💬 *Answers:*\n");
        for answer in &booking.answers {
            message.push_str(&format!(
                "• {}: {}\n",
                escape_markdown_v2(&answer.question),
                escape_markdown_v2(&answer.answer)
            ));
        }
    }

    message
}
