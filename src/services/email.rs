use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::error::UpstreamError;

/// Transactional mail via the Brevo SMTP API.
pub struct EmailClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailParty {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct TransactionalEmail {
    pub sender: EmailParty,
    pub to: EmailParty,
    pub subject: String,
    pub html: String,
}

impl EmailClient {
    pub fn new(http: reqwest::Client, base_url: Url, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    pub async fn send(&self, mail: &TransactionalEmail) -> Result<(), UpstreamError> {
        let url = self
            .base_url
            .join("/v3/smtp/email")
            .map_err(|err| UpstreamError::other(format!("brevo smtp endpoint: {err}")))?;

        let payload = json!({
            "sender": mail.sender,
            "to": [mail.to],
            "subject": mail.subject,
            "htmlContent": mail.html,
        });

        let res = self
            .http
            .post(url)
            .header("accept", "application/json")
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| UpstreamError::transport("brevo smtp send", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("brevo smtp send", res).await);
        }
        Ok(())
    }
}
