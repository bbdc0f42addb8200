use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ApiError, AppState, CurrentUser};
use crate::domain::aggregates::{Order, Quote, QuoteCustomer, QuoteItemRequest, QuoteSubmission};
use crate::domain::value_objects::Money;
use crate::services::Caller;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitQuoteRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub company: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub items: Vec<QuoteItemBody>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuoteItemBody {
    #[validate(length(min = 1))]
    pub product_id: String,
    pub variant_id: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub name: String,
    pub sku: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: u32,
    pub list_price: Option<Decimal>,
}

impl SubmitQuoteRequest {
    fn into_submission(self, currency: &str) -> QuoteSubmission {
        QuoteSubmission {
            customer: QuoteCustomer { user_id: None, name: self.name, email: self.email, phone: self.phone, company: self.company },
            items: self
                .items
                .into_iter()
                .map(|i| QuoteItemRequest {
                    product_id: i.product_id,
                    variant_id: i.variant_id,
                    name: i.name,
                    sku: i.sku,
                    quantity: i.quantity,
                    list_price: i.list_price.map(|p| Money::new(p, currency)),
                })
                .collect(),
            notes: self.notes,
        }
    }
}

pub async fn submit(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(r): Json<SubmitQuoteRequest>,
) -> Result<(StatusCode, Json<Quote>), ApiError> {
    r.validate()?;
    for item in &r.items {
        item.validate()?;
    }
    let submission = r.into_submission(s.quotes.currency());
    let caller = user.map(Caller::user).unwrap_or_else(Caller::guest);
    let quote = s.quotes.submit(caller, submission).await?;
    Ok((StatusCode::CREATED, Json(quote)))
}

pub async fn get_quote(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Quote>, ApiError> {
    let caller = user.map(Caller::user).unwrap_or_else(Caller::guest);
    Ok(Json(s.quotes.get(caller, id).await?))
}

pub async fn accept(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Quote>, ApiError> {
    let user = user.ok_or_else(|| ApiError::Unauthorized("sign in to accept quotes".into()))?;
    Ok(Json(s.quotes.accept(Caller::user(user), id).await?))
}

#[derive(Debug, Serialize)]
pub struct ConversionResponse {
    pub quote: Quote,
    pub order: Order,
}

pub async fn convert(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ConversionResponse>), ApiError> {
    let user = user.ok_or_else(|| ApiError::Unauthorized("sign in to place orders".into()))?;
    let (quote, order) = s.quotes.convert(Caller::user(user), id).await?;
    Ok((StatusCode::CREATED, Json(ConversionResponse { quote, order })))
}
