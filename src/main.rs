mod apidoc;
mod config;
mod error;
mod flow;
mod handlers;
mod markup;
mod models;
mod routes;
mod services;
mod utils;

use std::sync::Arc;

use axum::{
    Router,
    http::{Method, header},
    response::IntoResponse,
    routing::post,
};
use config::{Config, MarketingPlatformKind};
use services::{
    email::EmailClient,
    marketing::{MarketingPlatform, activecampaign::ActiveCampaignClient, brevo::BrevoClient},
    sheets::SheetsClient,
    supabase::SupabaseAdmin,
    telegram::TelegramClient,
    tidycal::TidycalClient,
    watermark::WatermarkStore,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Shared per-process state. Provider clients are `None` when their
/// credentials are absent; the owning handler then answers with a
/// configuration error instead of attempting any outbound call.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub marketing: Option<Arc<dyn MarketingPlatform>>,
    pub email: Option<Arc<EmailClient>>,
    pub sheets: Option<Arc<SheetsClient>>,
    pub telegram: Option<Arc<TelegramClient>>,
    pub tidycal: Option<Arc<TidycalClient>>,
    pub directory: Option<Arc<SupabaseAdmin>>,
    pub watermark: Arc<WatermarkStore>,
}

impl AppState {
    pub fn from_config(cfg: Config, http: reqwest::Client) -> Self {
        let marketing: Option<Arc<dyn MarketingPlatform>> = match cfg.marketing_platform {
            MarketingPlatformKind::Brevo => cfg.brevo_api_key.clone().map(|key| {
                Arc::new(BrevoClient::new(
                    http.clone(),
                    cfg.brevo_base_url.clone(),
                    key,
                )) as Arc<dyn MarketingPlatform>
            }),
            MarketingPlatformKind::ActiveCampaign => cfg
                .activecampaign_base_url
                .clone()
                .zip(cfg.activecampaign_api_token.clone())
                .map(|(base_url, token)| {
                    Arc::new(ActiveCampaignClient::new(
                        http.clone(),
                        base_url,
                        token,
                        cfg.activecampaign_field_ids.clone(),
                    )) as Arc<dyn MarketingPlatform>
                }),
        };

        let email = cfg.brevo_api_key.clone().map(|key| {
            Arc::new(EmailClient::new(
                http.clone(),
                cfg.brevo_base_url.clone(),
                key,
            ))
        });

        let sheets = cfg
            .sheets_webhook_url
            .clone()
            .map(|url| Arc::new(SheetsClient::new(http.clone(), url)));

        let telegram = cfg
            .telegram_bot_token
            .clone()
            .zip(cfg.telegram_chat_id.clone())
            .map(|(token, chat_id)| {
                Arc::new(TelegramClient::new(
                    http.clone(),
                    cfg.telegram_base_url.clone(),
                    token,
                    chat_id,
                ))
            });

        let tidycal = cfg.tidycal_api_key.clone().map(|key| {
            Arc::new(TidycalClient::new(
                http.clone(),
                cfg.tidycal_base_url.clone(),
                key,
            ))
        });

        let directory = cfg
            .supabase_url
            .clone()
            .zip(cfg.supabase_service_role_key.clone())
            .map(|(url, key)| Arc::new(SupabaseAdmin::new(http.clone(), url, key)));

        let watermark = Arc::new(WatermarkStore::new(cfg.booking_watermark_path.clone()));

        Self {
            cfg,
            marketing,
            email,
            sheets,
            telegram,
            tidycal,
            directory,
            watermark,
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Browser forms post cross-origin; preflights are answered here, before
    // any validation runs.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/forms/newsletter", post(routes::forms::newsletter))
        .route("/forms/quiz", post(routes::forms::quiz))
        .route("/forms/application", post(routes::forms::application))
        .route("/webhooks/tidycal", post(routes::bookings::tidycal_webhook))
        .route("/bookings/check", post(routes::bookings::check_bookings))
        .route("/admin/customers", post(routes::admin::create_customer))
        .route("/admin/password-reset", post(routes::admin::reset_password))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", apidoc::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .with_state(state)
}

/// A panicking handler must still answer with the structured error body.
fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("panic");
    tracing::error!(detail, "handler panicked");
    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(serde_json::json!({ "error": "Internal server error" })),
    )
        .into_response()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env().expect("Failed to load configuration");
    let http = reqwest::Client::new();
    // Compute before moving state anywhere
    let addr = format!("{}:{}", cfg.app_host, cfg.app_port);

    let state = AppState::from_config(cfg, http);
    let app = router(state);

    let listener = TcpListener::bind(&addr).await.unwrap();

    tracing::info!("form-relay listening on http://{addr}");
    axum::serve(listener, app).await.unwrap();
}
