use serde_json::Value;
use url::Url;

use crate::error::UpstreamError;

/// Read-only client for the TidyCal bookings feed.
pub struct TidycalClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl TidycalClient {
    pub fn new(http: reqwest::Client, base_url: Url, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    /// Fetch the booking list. The feed has shipped both `{"data": [...]}`
    /// and a bare array; accept either.
    pub async fn list_bookings(&self) -> Result<Vec<Value>, UpstreamError> {
        let url = self
            .base_url
            .join("/api/bookings")
            .map_err(|err| UpstreamError::other(format!("tidycal endpoint: {err}")))?;

        let res = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|err| UpstreamError::transport("tidycal bookings", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("tidycal bookings", res).await);
        }

        let body: Value = res
            .json()
            .await
            .map_err(|err| UpstreamError::transport("tidycal bookings", err))?;
        let bookings = body
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .or_else(|| body.as_array().cloned())
            .unwrap_or_default();
        Ok(bookings)
    }
}
