use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::{ContactSync, MarketingPlatform, SyncedContact, is_duplicate_rejection};
use crate::error::UpstreamError;
use crate::flow::Outcome;

pub struct BrevoClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl BrevoClient {
    pub fn new(http: reqwest::Client, base_url: Url, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|err| UpstreamError::other(format!("brevo endpoint {path}: {err}")))
    }
}

#[async_trait]
impl MarketingPlatform for BrevoClient {
    async fn sync_contact(&self, contact: &ContactSync) -> Result<SyncedContact, UpstreamError> {
        let url = self.endpoint("/v3/contacts")?;

        let mut attributes = contact.attributes.clone();
        if let Some(first_name) = &contact.first_name {
            attributes.insert("FIRSTNAME".to_string(), json!(first_name));
        }
        // Brevo takes list placement inline with the upsert, so a signup is
        // a single call.
        let list_ids: Vec<i64> = contact
            .list
            .iter()
            .filter_map(|list| list.parse().ok())
            .collect();

        let payload = json!({
            "email": contact.email,
            "attributes": attributes,
            "listIds": list_ids,
            "updateEnabled": true,
        });

        let res = self
            .http
            .post(url)
            .header("accept", "application/json")
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| UpstreamError::transport("brevo contact sync", err))?;

        let status = res.status();
        if status.is_success() {
            // 201 carries {"id": ...}; 204 (update) has no body.
            let body: Value = res.json().await.unwrap_or(Value::Null);
            let id = body
                .get("id")
                .and_then(|id| id.as_i64().map(|n| n.to_string()).or_else(|| id.as_str().map(String::from)));
            return Ok(SyncedContact {
                id,
                email: contact.email.clone(),
                outcome: Outcome::Created,
            });
        }

        let err = UpstreamError::from_response("brevo contact sync", res).await;
        if is_duplicate_rejection(status, err.provider_message()) {
            return Ok(SyncedContact {
                id: None,
                email: contact.email.clone(),
                outcome: Outcome::AlreadyExists,
            });
        }
        Err(err)
    }

    async fn add_to_list(&self, contact: &SyncedContact, list: &str) -> Result<(), UpstreamError> {
        let url = self.endpoint(&format!("/v3/contacts/lists/{list}/contacts/add"))?;

        let res = self
            .http
            .post(url)
            .header("accept", "application/json")
            .header("api-key", &self.api_key)
            .json(&json!({ "emails": [contact.email] }))
            .send()
            .await
            .map_err(|err| UpstreamError::transport("brevo list add", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("brevo list add", res).await);
        }
        Ok(())
    }

    async fn apply_tag(&self, _contact: &SyncedContact, tag: &str) -> Result<(), UpstreamError> {
        // Brevo models segmentation through lists and attributes; there is no
        // tag endpoint to call.
        debug!(tag, "apply_tag is a no-op for Brevo");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn client(server: &mockito::ServerGuard) -> BrevoClient {
        BrevoClient::new(
            reqwest::Client::new(),
            Url::parse(&server.url()).unwrap(),
            "test-key".into(),
        )
    }

    fn signup(list: &str) -> ContactSync {
        ContactSync {
            email: "a@b.at".into(),
            first_name: Some("Anna".into()),
            attributes: BTreeMap::new(),
            list: Some(list.into()),
        }
    }

    #[tokio::test]
    async fn sync_sends_attributes_and_list() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v3/contacts")
            .match_header("api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "email": "a@b.at",
                "attributes": { "FIRSTNAME": "Anna" },
                "listIds": [2],
                "updateEnabled": true,
            })))
            .with_status(201)
            .with_body(r#"{"id": 4711}"#)
            .create_async()
            .await;

        let contact = client(&server).sync_contact(&signup("2")).await.unwrap();
        mock.assert_async().await;
        assert_eq!(contact.outcome, Outcome::Created);
        assert_eq!(contact.id.as_deref(), Some("4711"));
    }

    #[tokio::test]
    async fn duplicate_rejection_resolves_to_already_exists() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v3/contacts")
            .with_status(400)
            .with_body(r#"{"code":"duplicate_parameter","message":"Unable to create contact, email already exists"}"#)
            .create_async()
            .await;

        let contact = client(&server).sync_contact(&signup("2")).await.unwrap();
        assert_eq!(contact.outcome, Outcome::AlreadyExists);
        assert!(contact.id.is_none());
    }

    #[tokio::test]
    async fn other_rejections_keep_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v3/contacts")
            .with_status(400)
            .with_body(r#"{"code":"invalid_parameter","message":"email is invalid"}"#)
            .create_async()
            .await;

        let err = client(&server).sync_contact(&signup("2")).await.unwrap_err();
        assert_eq!(err.status.map(|s| s.as_u16()), Some(400));
        assert_eq!(err.provider_message(), "email is invalid");
    }

    #[tokio::test]
    async fn update_without_body_still_succeeds() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v3/contacts")
            .with_status(204)
            .create_async()
            .await;

        let contact = client(&server).sync_contact(&signup("2")).await.unwrap();
        assert_eq!(contact.outcome, Outcome::Created);
        assert!(contact.id.is_none());
    }

    #[tokio::test]
    async fn add_to_list_posts_the_email() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v3/contacts/lists/8/contacts/add")
            .match_body(Matcher::PartialJson(json!({ "emails": ["a@b.at"] })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        let contact = SyncedContact {
            id: Some("1".into()),
            email: "a@b.at".into(),
            outcome: Outcome::Created,
        };
        client(&server).add_to_list(&contact, "8").await.unwrap();
        mock.assert_async().await;
    }
}
