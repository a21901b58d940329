use serde_json::Value;
use url::Url;

use crate::error::UpstreamError;

/// Append-only webhook in front of a spreadsheet (an Apps Script deployment
/// that turns any posted JSON object into a row).
pub struct SheetsClient {
    http: reqwest::Client,
    webhook_url: Url,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, webhook_url: Url) -> Self {
        Self { http, webhook_url }
    }

    pub async fn append(&self, row: &Value) -> Result<(), UpstreamError> {
        let res = self
            .http
            .post(self.webhook_url.clone())
            .json(row)
            .send()
            .await
            .map_err(|err| UpstreamError::transport("sheets append", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("sheets append", res).await);
        }
        Ok(())
    }
}
