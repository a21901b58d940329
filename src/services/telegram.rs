use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::UpstreamError;
use crate::markup::strip_markup;

/// Bot-API client posting into one fixed chat.
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: Url,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(http: reqwest::Client, base_url: Url, bot_token: String, chat_id: String) -> Self {
        Self {
            http,
            base_url,
            bot_token,
            chat_id,
        }
    }

    /// Send a MarkdownV2 message. When Telegram rejects the markup with a
    /// parse error, retry once as plain text with the markup stripped.
    pub async fn send_message(&self, text: &str) -> Result<(), UpstreamError> {
        match self.send(text, Some("MarkdownV2")).await {
            Ok(()) => Ok(()),
            Err(err) if err.provider_message().contains("parse") => {
                debug!("telegram rejected markup, retrying as plain text");
                self.send(&strip_markup(text), None).await
            }
            Err(err) => Err(err),
        }
    }

    async fn send(&self, text: &str, parse_mode: Option<&str>) -> Result<(), UpstreamError> {
        let url = self
            .base_url
            .join(&format!("/bot{}/sendMessage", self.bot_token))
            .map_err(|err| UpstreamError::other(format!("telegram endpoint: {err}")))?;

        let mut payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": false,
        });
        if let Some(mode) = parse_mode {
            payload["parse_mode"] = json!(mode);
        }

        let res = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| UpstreamError::transport("telegram send", err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response("telegram send", res).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> TelegramClient {
        TelegramClient::new(
            reqwest::Client::new(),
            Url::parse(&server.url()).unwrap(),
            "123:abc".into(),
            "42".into(),
        )
    }

    #[tokio::test]
    async fn sends_markdown_v2_into_the_configured_chat() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJson(json!({
                "chat_id": "42",
                "parse_mode": "MarkdownV2",
            })))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        client(&server).send_message("📅 *New booking\\!*").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn parse_rejection_falls_back_to_plain_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJson(json!({ "parse_mode": "MarkdownV2" })))
            .with_status(400)
            .with_body(r#"{"ok":false,"description":"Bad Request: can't parse entities"}"#)
            .create_async()
            .await;
        // Exact body match: the retry must carry no parse_mode.
        let plain = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::Json(json!({
                "chat_id": "42",
                "text": "Name: Anna.",
                "disable_web_page_preview": false,
            })))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        client(&server).send_message(r"*Name:* Anna\.").await.unwrap();
        plain.assert_async().await;
    }

    #[tokio::test]
    async fn non_parse_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok":false,"description":"Forbidden: bot was blocked"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server).send_message("hello").await.unwrap_err();
        mock.assert_async().await;
        assert_eq!(err.status.map(|s| s.as_u16()), Some(403));
    }
}
