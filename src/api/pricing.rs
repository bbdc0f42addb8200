use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState, CurrentUser};
use crate::domain::aggregates::Product;
use crate::domain::pricing::{PricingDecision, ProductPricingView};

pub async fn decision(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Json<PricingDecision> {
    let cache = s.pricing.rule_cache();
    Json(s.pricing.decide(user, &cache).await)
}

#[derive(Debug, Deserialize)]
pub struct ProductRef {
    pub product: Product,
    pub variant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductViewsRequest {
    pub products: Vec<ProductRef>,
}

#[derive(Debug, Serialize)]
pub struct ProductViewsResponse {
    pub decision: PricingDecision,
    pub views: Vec<ProductPricingView>,
}

const MAX_PRODUCTS: usize = 100;

pub async fn product_views(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(r): Json<ProductViewsRequest>,
) -> Result<Json<ProductViewsResponse>, ApiError> {
    if r.products.len() > MAX_PRODUCTS {
        return Err(ApiError::BadRequest(format!("at most {MAX_PRODUCTS} products per request")));
    }
    for p in &r.products {
        p.product.check_prices().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    }
    let products: Vec<_> = r.products.into_iter().map(|p| (p.product, p.variant_id)).collect();
    let (decision, views) = s.pricing.product_views(user, &products).await;
    Ok(Json(ProductViewsResponse { decision, views }))
}
