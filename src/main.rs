//! Cedar Commerce - pricing visibility and quote service

use anyhow::Result;
use cedar_commerce::{
    api::{self, AppState},
    config::AppConfig,
    domain::pricing::ProfileClassificationProvider,
    infrastructure::{EventPublisher, LogPublisher, NatsPublisher, PgBusinessProfileRepository, PgQuoteRepository, PgRuleSetRepository},
    services::{PricingService, QuoteService},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new().max_connections(config.database.max_connections).connect(&config.database.url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsPublisher::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, domain events will only be logged");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };

    let rules = Arc::new(PgRuleSetRepository::new(db.clone()));
    let initial = rules.ensure_initialized().await?;
    tracing::info!(version = initial.version, "pricing rules loaded");

    let classifier = Arc::new(ProfileClassificationProvider::new(Arc::new(PgBusinessProfileRepository::new(db.clone()))));
    let pricing = PricingService::new(classifier, rules, events.clone());
    let quotes = QuoteService::new(Arc::new(PgQuoteRepository::new(db)), pricing.clone(), events, config.currency.clone());
    if config.server.admin_token.is_none() {
        tracing::warn!("ADMIN_API_TOKEN not set, admin endpoints are disabled");
    }
    let state = AppState { pricing, quotes, admin_token: config.server.admin_token.as_deref().map(Arc::from) };

    let app = api::router(state);
    let addr = format!("0.0.0.0:{}", config.server.port);
    tracing::info!("Cedar Commerce listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
