use axum::{extract::State, Json};
use serde::Deserialize;

use super::{ApiError, AppState, CurrentUser};
use crate::domain::aggregates::{Cart, CartItem};

const MAX_CART_LINES: usize = 200;

#[derive(Debug, Deserialize)]
pub struct CartRequest {
    pub items: Vec<CartItem>,
}

/// Checks a storefront cart against the caller's checkout rights before payment.
pub async fn validate(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(r): Json<CartRequest>,
) -> Result<Json<Cart>, ApiError> {
    let user = user.ok_or_else(|| ApiError::Unauthorized("sign in to check out".into()))?;
    if r.items.len() > MAX_CART_LINES {
        return Err(ApiError::BadRequest(format!("at most {MAX_CART_LINES} cart lines")));
    }
    Ok(Json(s.pricing.admit_cart(user, r.items, s.quotes.currency()).await?))
}
