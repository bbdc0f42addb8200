//! Product Aggregate
//!
//! Catalogue entries are owned by the storefront backend; pricing only reads them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Sku, Money, Quantity};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    id: String,
    sku: Sku,
    name: String,
    price: Money,
    #[serde(default)]
    compare_at_price: Option<Money>,
    #[serde(default)]
    inventory: Quantity,
    #[serde(default)]
    variants: Vec<Variant>,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub sku: Option<Sku>,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub inventory: Quantity,
}

impl Product {
    pub fn create(sku: Sku, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: Uuid::new_v4().to_string(), sku, name: name.into(), price, compare_at_price: None,
            inventory: Quantity::default(), variants: vec![], updated_at: Utc::now(),
        }
    }

    pub fn with_compare_at_price(mut self, price: Money) -> Self {
        self.compare_at_price = Some(price);
        self
    }

    pub fn with_inventory(mut self, stock: u32) -> Self {
        self.inventory = Quantity::new(stock);
        self
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn sku(&self) -> &Sku { &self.sku }
    pub fn name(&self) -> &str { &self.name }
    pub fn price(&self) -> &Money { &self.price }
    pub fn compare_at_price(&self) -> Option<&Money> { self.compare_at_price.as_ref() }
    pub fn inventory(&self) -> &Quantity { &self.inventory }
    pub fn variants(&self) -> &[Variant] { &self.variants }
    pub fn variant(&self, id: &str) -> Option<&Variant> { self.variants.iter().find(|v| v.id == id) }

    /// Prices must be non-negative and compare-at prices strictly positive.
    pub fn check_prices(&self) -> Result<(), ProductError> {
        check_price(&self.id, &self.price, self.compare_at_price.as_ref())?;
        for v in &self.variants {
            check_price(&v.id, &v.price, v.compare_at_price.as_ref())?;
        }
        Ok(())
    }
}

fn check_price(id: &str, price: &Money, compare_at: Option<&Money>) -> Result<(), ProductError> {
    if price.is_negative() {
        return Err(ProductError::NegativePrice(id.to_string()));
    }
    match compare_at {
        Some(c) if c.amount() <= Decimal::ZERO => Err(ProductError::InvalidCompareAtPrice(id.to_string())),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProductError {
    #[error("Negative price on {0}")]
    NegativePrice(String),
    #[error("Compare-at price on {0} must be positive")]
    InvalidCompareAtPrice(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku_normalised_on_create() {
        let p = Product::create(Sku::new("ctrl-panel").unwrap(), "Controller Panel", Money::inr(Decimal::new(45000, 0)));
        assert_eq!(p.name(), "Controller Panel");
        assert_eq!(p.sku().as_str(), "CTRL-PANEL");
        assert!(p.inventory().is_zero());
    }

    #[test]
    fn test_snapshot_from_storefront_json() {
        let p: Product = serde_json::from_value(serde_json::json!({
            "id": "rope-8mm", "sku": "rope-8mm", "name": "Steel Rope 8mm",
            "price": { "amount": "1200", "currency": "INR" },
            "inventory": 7
        }))
        .unwrap();
        assert_eq!(p.sku().as_str(), "ROPE-8MM");
        assert_eq!(p.inventory().value(), 7);
        assert!(p.compare_at_price().is_none());
        assert!(p.variants().is_empty());
    }

    #[test]
    fn test_variant_lookup() {
        let p = Product::create(Sku::new("CABIN").unwrap(), "Cabin", Money::inr(Decimal::new(200000, 0))).with_variant(Variant {
            id: "ss".into(), sku: None, name: "Stainless".into(),
            price: Money::inr(Decimal::new(260000, 0)), compare_at_price: None, inventory: Quantity::new(2),
        });
        assert_eq!(p.variant("ss").unwrap().price.amount(), Decimal::new(260000, 0));
        assert!(p.variant("glass").is_none());
    }

    #[test]
    fn test_price_checks() {
        let ok = Product::create(Sku::new("ROPE").unwrap(), "Rope", Money::inr(Decimal::new(1200, 0)))
            .with_compare_at_price(Money::inr(Decimal::new(1500, 0)));
        assert!(ok.check_prices().is_ok());

        let negative = Product::create(Sku::new("ROPE").unwrap(), "Rope", Money::inr(Decimal::new(-5, 0)));
        assert!(matches!(negative.check_prices(), Err(ProductError::NegativePrice(_))));

        let zero_compare = ok.with_variant(Variant {
            id: "12mm".into(), sku: None, name: "12mm".into(), price: Money::inr(Decimal::ONE),
            compare_at_price: Some(Money::inr(Decimal::ZERO)), inventory: Quantity::new(1),
        });
        assert!(matches!(zero_compare.check_prices(), Err(ProductError::InvalidCompareAtPrice(id)) if id == "12mm"));
    }
}
