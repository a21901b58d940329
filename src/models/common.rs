use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::flow::Outcome;

/// Happy-path envelope shared by the form and webhook routes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionReply {
    pub success: bool,
    pub message: String,
    /// Set when a duplicate submission was remapped to success.
    #[serde(rename = "alreadyExists", skip_serializing_if = "Option::is_none")]
    pub already_exists: Option<bool>,
}

impl SubmissionReply {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            already_exists: None,
        }
    }

    pub fn duplicate(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            already_exists: Some(true),
        }
    }

    /// Pick the reply variant matching the primary call's classification.
    pub fn for_outcome(outcome: Outcome, created: &str, duplicate: &str) -> Self {
        if outcome.already_exists() {
            Self::duplicate(duplicate)
        } else {
            Self::ok(created)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorMessage {
    pub error: String,
}

/// Result of a booking-check run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckReply {
    pub success: bool,
    pub message: String,
    #[serde(rename = "totalBookings")]
    pub total_bookings: usize,
    #[serde(rename = "newBookings")]
    pub new_bookings: usize,
}
