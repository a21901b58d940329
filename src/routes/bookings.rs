use axum::{Json, extract::State};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::{
    AppState,
    error::ApiError,
    handlers,
    models::common::{CheckReply, SubmissionReply},
};

#[utoipa::path(
    post,
    path = "/webhooks/tidycal",
    tag = "bookings",
    responses(
        (status = 200, description = "Notification sent", body = SubmissionReply),
        (status = 500, description = "Configuration or provider error", body = crate::models::common::ErrorMessage)
    )
)]
pub async fn tidycal_webhook(
    State(state): State<AppState>,
    Json(payload): Json<JsonValue>,
) -> Result<Json<SubmissionReply>, ApiError> {
    info!("Incoming TidyCal webhook");
    let reply = handlers::booking::notify_webhook(&state, payload).await?;
    Ok(Json(reply))
}

#[utoipa::path(
    post,
    path = "/bookings/check",
    tag = "bookings",
    responses(
        (status = 200, description = "Check completed", body = CheckReply),
        (status = 500, description = "Configuration or provider error", body = crate::models::common::ErrorMessage)
    )
)]
pub async fn check_bookings(State(state): State<AppState>) -> Result<Json<CheckReply>, ApiError> {
    let outcome = handlers::booking::check(&state).await?;
    Ok(Json(CheckReply {
        success: true,
        message: "Check completed".into(),
        total_bookings: outcome.total,
        new_bookings: outcome.new,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use mockito::Matcher;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use url::Url;

    use crate::AppState;
    use crate::config::Config;
    use crate::services::telegram::TelegramClient;
    use crate::services::tidycal::TidycalClient;
    use crate::services::watermark::WatermarkStore;

    fn state_with_bookings(
        server: &mockito::ServerGuard,
        watermark_dir: &tempfile::TempDir,
    ) -> AppState {
        let mut state = AppState::from_config(Config::for_tests(), reqwest::Client::new());
        let base = Url::parse(&server.url()).unwrap();
        state.telegram = Some(Arc::new(TelegramClient::new(
            reqwest::Client::new(),
            base.clone(),
            "123:abc".into(),
            "42".into(),
        )));
        state.tidycal = Some(Arc::new(TidycalClient::new(
            reqwest::Client::new(),
            base,
            "tidy-key".into(),
        )));
        state.watermark = Arc::new(WatermarkStore::new(watermark_dir.path().join("mark.json")));
        state
    }

    async fn post_json(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn webhook_notifies_with_escaped_markup() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let send = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJsonString(
                json!({ "chat_id": "42", "parse_mode": "MarkdownV2" }).to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let (status, body) = post_json(
            crate::router(state_with_bookings(&server, &dir)),
            "/webhooks/tidycal",
            json!({
                "contact": { "name": "Anna (she/her)", "email": "a@b.at" },
                "start_time": "2026-08-10T09:00:00+00:00",
                "booking_type": { "name": "Strategy call" },
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Notification sent");
        send.assert_async().await;
    }

    #[tokio::test]
    async fn webhook_surfaces_a_failed_send() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok":false,"description":"Forbidden: bot was blocked"}"#)
            .create_async()
            .await;

        let (status, _body) = post_json(
            crate::router(state_with_bookings(&server, &dir)),
            "/webhooks/tidycal",
            json!({ "name": "Anna" }),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn check_notifies_new_bookings_and_advances_the_mark() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        let recent = (Utc::now() - Duration::minutes(5)).to_rfc3339();
        let stale = (Utc::now() - Duration::days(3)).to_rfc3339();
        server
            .mock("GET", "/api/bookings")
            .with_status(200)
            .with_body(
                json!({ "data": [
                    { "name": "Old", "created_at": stale },
                    { "name": "Fresh", "created_at": recent },
                ]})
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;
        let send = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJsonString(
                json!({ "chat_id": "42" }).to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;

        let state = state_with_bookings(&server, &dir);

        let (status, body) =
            post_json(crate::router(state.clone()), "/bookings/check", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalBookings"], 2);
        assert_eq!(body["newBookings"], 1);

        // Second run: the watermark now covers both bookings, so nothing is
        // re-notified.
        let (status, body) =
            post_json(crate::router(state), "/bookings/check", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["newBookings"], 0);

        send.assert_async().await;
    }

    #[tokio::test]
    async fn check_surfaces_a_failed_feed_fetch() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        server
            .mock("GET", "/api/bookings")
            .with_status(500)
            .with_body(r#"{"message":"feed down"}"#)
            .create_async()
            .await;

        let (status, _body) = post_json(
            crate::router(state_with_bookings(&server, &dir)),
            "/bookings/check",
            json!({}),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn check_swallows_notification_failures() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        let recent = (Utc::now() - Duration::minutes(5)).to_rfc3339();
        server
            .mock("GET", "/api/bookings")
            .with_status(200)
            .with_body(json!({ "data": [{ "name": "Fresh", "created_at": recent }] }).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok":false,"description":"Forbidden"}"#)
            .create_async()
            .await;

        let (status, body) = post_json(
            crate::router(state_with_bookings(&server, &dir)),
            "/bookings/check",
            json!({}),
        )
        .await;

        // The feed fetch is the primary call; a lost notification does not
        // fail the run.
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
}
