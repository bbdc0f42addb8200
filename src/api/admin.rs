//! Admin-only endpoints. Mounted behind the bearer-token layer.

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::domain::aggregates::{PriceEdit, Quote, QuoteItem};
use crate::domain::pricing::{PricingRuleSet, PricingRules};
use crate::domain::value_objects::{Money, Percentage};
use crate::services::Caller;

pub async fn get_rules(State(s): State<AppState>) -> Result<Json<PricingRuleSet>, ApiError> {
    s.pricing
        .current_rules()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("pricing rules not initialised".into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRulesRequest {
    pub expected_version: u64,
    #[serde(flatten)]
    pub rules: PricingRules,
}

pub async fn update_rules(State(s): State<AppState>, Json(r): Json<UpdateRulesRequest>) -> Result<Json<PricingRuleSet>, ApiError> {
    Ok(Json(s.pricing.update_rules(r.expected_version, r.rules).await?))
}

pub async fn get_quote(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Quote>, ApiError> {
    Ok(Json(s.quotes.get(Caller::admin(), id).await?))
}

/// Exactly one of the two fields must be set.
#[derive(Debug, Deserialize)]
pub struct PriceItemRequest {
    pub discount_percentage: Option<Percentage>,
    pub unit_price: Option<Decimal>,
}

impl PriceItemRequest {
    fn into_edit(self, currency: &str) -> Result<PriceEdit, ApiError> {
        match (self.discount_percentage, self.unit_price) {
            (Some(percentage), None) => Ok(PriceEdit::Discount { percentage }),
            (None, Some(amount)) => Ok(PriceEdit::UnitPrice { amount: Money::new(amount, currency) }),
            _ => Err(ApiError::BadRequest("set either discount_percentage or unit_price".into())),
        }
    }
}

pub async fn price_item(
    State(s): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(r): Json<PriceItemRequest>,
) -> Result<Json<QuoteItem>, ApiError> {
    let edit = r.into_edit(s.quotes.currency())?;
    Ok(Json(s.quotes.price_item(id, item_id, edit).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkPricedRequest {
    #[serde(default)]
    pub admin_notes: Option<String>,
}

pub async fn mark_priced(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<MarkPricedRequest>,
) -> Result<Json<Quote>, ApiError> {
    Ok(Json(s.quotes.mark_priced(id, r.admin_notes).await?))
}
