//! Applies a pricing decision to a catalogue product.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::{AllowedAction, PricingDecision};
use crate::domain::aggregates::Product;
use crate::domain::value_objects::Money;

const LOW_STOCK_THRESHOLD: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn from_quantity(quantity: u32) -> Self {
        match quantity {
            0 => Self::OutOfStock,
            q if q <= LOW_STOCK_THRESHOLD => Self::LowStock,
            _ => Self::InStock,
        }
    }
}

/// What a product card or detail page may render for the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPricingView {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub price: Option<Money>,
    pub compare_at_price: Option<Money>,
    pub savings_percentage: Option<Decimal>,
    pub stock_status: StockStatus,
    pub minimum_order_quantity: u32,
    pub can_add_to_cart: bool,
    pub can_request_quote: bool,
    pub price_hint: Option<String>,
}

impl ProductPricingView {
    /// Builds the view for the product, or for one of its variants when `variant_id` matches.
    pub fn build(product: &Product, variant_id: Option<&str>, decision: &PricingDecision) -> Self {
        let variant = variant_id.and_then(|id| product.variant(id));
        let (price, compare_at, stock) = match variant {
            Some(v) => (&v.price, v.compare_at_price.as_ref(), v.inventory.value()),
            None => (product.price(), product.compare_at_price(), product.inventory().value()),
        };
        let stock_status = StockStatus::from_quantity(stock);

        let (price, compare_at_price, savings_percentage) = if decision.show_price {
            let compare_at = compare_at
                .filter(|c| c.currency() == price.currency() && !price.is_negative() && c.amount() > price.amount());
            let savings = compare_at.map(|c| savings(price, c));
            (Some(price.clone()), compare_at.cloned(), savings)
        } else {
            (None, None, None)
        };

        Self {
            product_id: product.id().to_string(),
            variant_id: variant.map(|v| v.id.clone()),
            price,
            compare_at_price,
            savings_percentage,
            stock_status,
            minimum_order_quantity: decision.minimum_order_quantity,
            can_add_to_cart: decision.can_checkout && stock_status != StockStatus::OutOfStock,
            can_request_quote: decision.allowed_action != AllowedAction::Login,
            price_hint: decision.reason.clone(),
        }
    }
}

fn savings(price: &Money, compare_at: &Money) -> Decimal {
    ((compare_at.amount() - price.amount()) / compare_at.amount() * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}
