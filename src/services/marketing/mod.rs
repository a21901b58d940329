use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::flow::Outcome;

pub mod activecampaign;
pub mod brevo;

/// Provider-neutral contact upsert request.
#[derive(Debug, Clone, Default)]
pub struct ContactSync {
    pub email: String,
    pub first_name: Option<String>,
    /// Extra attributes by their Brevo-style names; the ActiveCampaign
    /// adapter maps them to custom field ids from configuration.
    pub attributes: BTreeMap<String, Value>,
    /// Target list, when the submission places the contact on one.
    pub list: Option<String>,
}

/// Result of a contact upsert. `id` is absent when the provider does not
/// return one (duplicate rejections, 204 updates).
#[derive(Debug, Clone)]
pub struct SyncedContact {
    pub id: Option<String>,
    pub email: String,
    pub outcome: Outcome,
}

/// One marketing platform behind the form handlers. Which adapter backs it
/// is picked from configuration, not by the handlers.
#[async_trait]
pub trait MarketingPlatform: Send + Sync {
    /// Create or update a contact; duplicate submissions resolve to
    /// [`Outcome::AlreadyExists`] instead of an error.
    async fn sync_contact(&self, contact: &ContactSync) -> Result<SyncedContact, UpstreamError>;

    /// Place an existing contact on a list.
    async fn add_to_list(&self, contact: &SyncedContact, list: &str) -> Result<(), UpstreamError>;

    /// Tag a contact, resolving (or creating) the tag by name first.
    async fn apply_tag(&self, contact: &SyncedContact, tag: &str) -> Result<(), UpstreamError>;
}

/// Duplicate-as-success detection: a rejected write whose provider message
/// says the resource is already on file counts as an idempotent resubmission,
/// not a failure.
pub fn is_duplicate_rejection(status: StatusCode, provider_message: &str) -> bool {
    (status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY)
        && provider_message.contains("already exists")
}
