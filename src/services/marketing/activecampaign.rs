use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::{ContactSync, MarketingPlatform, SyncedContact, is_duplicate_rejection};
use crate::error::UpstreamError;
use crate::flow::Outcome;

pub struct ActiveCampaignClient {
    http: reqwest::Client,
    base_url: Url,
    api_token: String,
    /// Attribute name → custom field id, from configuration. Attributes
    /// without a mapping are dropped with a debug log.
    field_ids: BTreeMap<String, String>,
}

impl ActiveCampaignClient {
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        api_token: String,
        field_ids: BTreeMap<String, String>,
    ) -> Self {
        Self {
            http,
            base_url,
            api_token,
            field_ids,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|err| UpstreamError::other(format!("activecampaign endpoint {path}: {err}")))
    }

    async fn post(&self, context: &'static str, path: &str, body: Value) -> Result<Value, UpstreamError> {
        let url = self.endpoint(path)?;
        let res = self
            .http
            .post(url)
            .header("Api-Token", &self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| UpstreamError::transport(context, err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response(context, res).await);
        }
        res.json()
            .await
            .map_err(|err| UpstreamError::transport(context, err))
    }

    fn field_values(&self, attributes: &BTreeMap<String, Value>) -> Vec<Value> {
        attributes
            .iter()
            .filter_map(|(name, value)| match self.field_ids.get(name) {
                Some(field) => Some(json!({ "field": field, "value": value })),
                None => {
                    debug!(attribute = %name, "no ActiveCampaign field id configured, dropping");
                    None
                }
            })
            .collect()
    }

    /// Resolve a tag name to its id, creating the tag when the search comes
    /// up empty.
    async fn resolve_tag_id(&self, tag: &str) -> Result<String, UpstreamError> {
        let mut url = self.endpoint("/api/3/tags")?;
        url.query_pairs_mut().append_pair("search", tag);

        let res = self
            .http
            .get(url)
            .header("Api-Token", &self.api_token)
            .send()
            .await
            .map_err(|err| UpstreamError::transport("activecampaign tag search", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("activecampaign tag search", res).await);
        }
        let body: Value = res
            .json()
            .await
            .map_err(|err| UpstreamError::transport("activecampaign tag search", err))?;

        // The search is a substring match; require the exact name.
        let existing = body
            .pointer("/tags")
            .and_then(Value::as_array)
            .and_then(|tags| {
                tags.iter().find(|t| {
                    t.get("tag").and_then(Value::as_str) == Some(tag)
                })
            })
            .and_then(|t| t.get("id").and_then(Value::as_str).map(String::from));
        if let Some(id) = existing {
            return Ok(id);
        }

        let created = self
            .post(
                "activecampaign tag create",
                "/api/3/tags",
                json!({ "tag": { "tag": tag, "tagType": "contact", "description": "" } }),
            )
            .await?;
        created
            .pointer("/tag/id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| UpstreamError::other("activecampaign tag create: no id in response"))
    }
}

#[async_trait]
impl MarketingPlatform for ActiveCampaignClient {
    async fn sync_contact(&self, contact: &ContactSync) -> Result<SyncedContact, UpstreamError> {
        let mut body = json!({
            "contact": {
                "email": contact.email,
                "fieldValues": self.field_values(&contact.attributes),
            }
        });
        if let Some(first_name) = &contact.first_name {
            body["contact"]["firstName"] = json!(first_name);
        }

        let url = self.endpoint("/api/3/contact/sync")?;
        let res = self
            .http
            .post(url)
            .header("Api-Token", &self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| UpstreamError::transport("activecampaign contact sync", err))?;

        let status = res.status();
        let synced = if status.is_success() {
            let body: Value = res
                .json()
                .await
                .map_err(|err| UpstreamError::transport("activecampaign contact sync", err))?;
            let id = body
                .pointer("/contact/id")
                .and_then(Value::as_str)
                .map(String::from);
            SyncedContact {
                id,
                email: contact.email.clone(),
                outcome: Outcome::Created,
            }
        } else {
            let err = UpstreamError::from_response("activecampaign contact sync", res).await;
            if !is_duplicate_rejection(status, err.provider_message()) {
                return Err(err);
            }
            SyncedContact {
                id: None,
                email: contact.email.clone(),
                outcome: Outcome::AlreadyExists,
            }
        };

        // List placement is a separate call here, but it is still part of the
        // logical signup: without it the contact never receives anything.
        if let Some(list) = &contact.list {
            self.add_to_list(&synced, list).await?;
        }

        Ok(synced)
    }

    async fn add_to_list(&self, contact: &SyncedContact, list: &str) -> Result<(), UpstreamError> {
        let id = contact
            .id
            .as_deref()
            .ok_or_else(|| UpstreamError::other("activecampaign list add: contact id unavailable"))?;
        self.post(
            "activecampaign list add",
            "/api/3/contactLists",
            json!({ "contactList": { "list": list, "contact": id, "status": "1" } }),
        )
        .await?;
        Ok(())
    }

    async fn apply_tag(&self, contact: &SyncedContact, tag: &str) -> Result<(), UpstreamError> {
        let id = contact
            .id
            .as_deref()
            .ok_or_else(|| UpstreamError::other("activecampaign tag: contact id unavailable"))?;
        let tag_id = self.resolve_tag_id(tag).await?;
        self.post(
            "activecampaign tag assign",
            "/api/3/contactTags",
            json!({ "contactTag": { "contact": id, "tag": tag_id } }),
        )
        .await?;
        Ok(())
    }
}
