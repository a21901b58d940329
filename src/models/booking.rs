use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::utils::first_str;

/// A pragmatic view of a TidyCal booking. The webhook and the bookings feed
/// name fields differently, so every field resolves through an ordered
/// fallback chain and degrades to a display default.
#[derive(Debug, Clone)]
pub struct Booking {
    pub name: String,
    pub email: String,
    /// Raw start time as sent by the provider.
    pub starts_at: Option<String>,
    pub booking_type: String,
    pub meeting_url: Option<String>,
    pub notes: Option<String>,
    pub answers: Vec<BookingAnswer>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct BookingAnswer {
    pub question: String,
    pub answer: String,
}

impl Booking {
    /// Lenient constructor from arbitrary JSON.
    pub fn from_loose(v: &Value) -> Self {
        let name = first_str(v, &["/name", "/contact/name"])
            .unwrap_or("Unknown")
            .to_string();
        let email = first_str(v, &["/email", "/contact/email"])
            .unwrap_or("No email")
            .to_string();
        let starts_at = first_str(v, &["/starts_at", "/start_time", "/datetime", "/date"])
            .map(str::to_string);
        let booking_type = first_str(v, &["/booking_type/name", "/event_name", "/event_type"])
            .unwrap_or("Appointment")
            .to_string();
        let meeting_url = first_str(
            v,
            &[
                "/location/join_url",
                "/zoom_join_url",
                "/meeting_url",
                "/zoom_link",
                "/location",
            ],
        )
        .map(str::to_string);
        let notes = first_str(v, &["/notes"]).map(str::to_string);
        let answers = v
            .pointer("/answers")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(BookingAnswer::from_loose).collect())
            .unwrap_or_default();
        let created_at = first_str(v, &["/created_at", "/createdAt"]).and_then(parse_timestamp);

        Self {
            name,
            email,
            starts_at,
            booking_type,
            meeting_url,
            notes,
            answers,
            created_at,
        }
    }

    /// Human-readable start time; the raw value when the provider sends
    /// something unparseable, a placeholder when it sends nothing.
    pub fn formatted_start(&self) -> String {
        match &self.starts_at {
            Some(raw) => parse_timestamp(raw)
                .map(|dt| dt.format("%A, %e %B %Y %H:%M UTC").to_string())
                .unwrap_or_else(|| raw.clone()),
            None => "No date".to_string(),
        }
    }
}

impl BookingAnswer {
    fn from_loose(v: &Value) -> Option<Self> {
        let question = first_str(v, &["/question", "/label"])?;
        let answer = first_str(v, &["/answer", "/value"])?;
        Some(Self {
            question: question.to_string(),
            answer: answer.to_string(),
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
