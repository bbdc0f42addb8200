//! HTTP surface: pricing decisions, quotes and admin endpoints.

pub mod admin;
pub mod cart;
pub mod error;
pub mod pricing;
pub mod quotes;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

pub use error::ApiError;

use crate::services::{PricingService, QuoteService};

/// Set by the upstream auth gateway for signed-in users.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub pricing: PricingService,
    pub quotes: QuoteService,
    pub admin_token: Option<Arc<str>>,
}

/// Authenticated user id, `None` for guests.
pub struct CurrentUser(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else { return Ok(Self(None)) };
        value
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(|id| Self(Some(id)))
            .ok_or_else(|| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER} header")))
    }
}

async fn require_admin(State(state): State<AppState>, headers: HeaderMap, request: Request, next: Next) -> Result<Response, ApiError> {
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match (state.admin_token.as_deref(), presented) {
        (Some(expected), Some(token)) if expected == token => Ok(next.run(request).await),
        _ => {
            tracing::warn!(path = %request.uri().path(), "rejected admin request");
            Err(ApiError::Unauthorized("admin token required".into()))
        }
    }
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/v1/admin/pricing-rules", get(admin::get_rules).put(admin::update_rules))
        .route("/api/v1/admin/quotes/:id", get(admin::get_quote))
        .route("/api/v1/admin/quotes/:id/items/:item_id/price", put(admin::price_item))
        .route("/api/v1/admin/quotes/:id/mark-priced", post(admin::mark_priced))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "cedar-commerce"})) }))
        .route("/api/v1/pricing/decision", get(pricing::decision))
        .route("/api/v1/pricing/products", post(pricing::product_views))
        .route("/api/v1/cart/validate", post(cart::validate))
        .route("/api/v1/quotes", post(quotes::submit))
        .route("/api/v1/quotes/:id", get(quotes::get_quote))
        .route("/api/v1/quotes/:id/accept", post(quotes::accept))
        .route("/api/v1/quotes/:id/convert", post(quotes::convert))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
