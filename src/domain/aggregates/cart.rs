//! Cart Aggregate
//!
//! Only callers whose pricing decision allows checkout may fill a cart.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::pricing::PricingDecision;
use crate::domain::value_objects::{Money, MoneyError};

#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    id: String,
    customer_id: Option<Uuid>,
    items: Vec<CartItem>,
    subtotal: Money,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Result<Money, MoneyError> { self.unit_price.multiply(self.quantity) }
}

impl Cart {
    pub fn for_customer(customer_id: Uuid, currency: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(), customer_id: Some(customer_id), items: vec![],
            subtotal: Money::zero(currency), currency: currency.to_string(), created_at: now, updated_at: now,
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn customer_id(&self) -> Option<Uuid> { self.customer_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn add_item(&mut self, item: CartItem, decision: &PricingDecision) -> Result<(), CartError> {
        ensure_checkout(decision)?;
        if item.unit_price.currency() != self.currency {
            return Err(CartError::Money(MoneyError::CurrencyMismatch));
        }
        if item.unit_price.is_negative() {
            return Err(CartError::NegativePrice);
        }
        let minimum = decision.minimum_order_quantity;
        let mut items = self.items.clone();
        if let Some(existing) = items.iter_mut().find(|i| i.product_id == item.product_id && i.variant_id == item.variant_id) {
            existing.quantity = existing.quantity.checked_add(item.quantity).ok_or(CartError::QuantityTooLarge)?;
        } else {
            if item.quantity < minimum {
                return Err(CartError::BelowMinimumOrder { minimum });
            }
            items.push(item);
        }
        self.commit(items)
    }

    pub fn update_quantity(&mut self, product_id: &str, quantity: u32, decision: &PricingDecision) -> Result<(), CartError> {
        ensure_checkout(decision)?;
        if !self.items.iter().any(|i| i.product_id == product_id) {
            return Err(CartError::ItemNotFound);
        }
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        if quantity < decision.minimum_order_quantity {
            return Err(CartError::BelowMinimumOrder { minimum: decision.minimum_order_quantity });
        }
        let mut items = self.items.clone();
        for item in items.iter_mut().filter(|i| i.product_id == product_id) {
            item.quantity = quantity;
        }
        self.commit(items)
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), CartError> {
        let items: Vec<_> = self.items.iter().filter(|i| i.product_id != product_id).cloned().collect();
        if items.len() == self.items.len() { return Err(CartError::ItemNotFound); }
        self.commit(items)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.subtotal = Money::zero(&self.currency);
        self.updated_at = Utc::now();
    }

    /// Replaces the lines only if their subtotal can be computed.
    fn commit(&mut self, items: Vec<CartItem>) -> Result<(), CartError> {
        let mut subtotal = Money::new(Decimal::ZERO, &self.currency);
        for item in &items {
            subtotal = subtotal.add(&item.line_total()?)?;
        }
        self.items = items;
        self.subtotal = subtotal;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn ensure_checkout(decision: &PricingDecision) -> Result<(), CartError> {
    if decision.can_checkout {
        return Ok(());
    }
    Err(CartError::CheckoutNotAllowed(decision.reason.clone().unwrap_or_else(|| "Request a quote instead".into())))
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CartError {
    #[error("Item not found")]
    ItemNotFound,
    #[error("Checkout not allowed: {0}")]
    CheckoutNotAllowed(String),
    #[error("Quantity is below the minimum order quantity of {minimum}")]
    BelowMinimumOrder { minimum: u32 },
    #[error("Quantity too large")]
    QuantityTooLarge,
    #[error("Unit price cannot be negative")]
    NegativePrice,
    #[error(transparent)]
    Money(#[from] MoneyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::{AccountClassification, PricingRules, PricingVisibilityResolver};

    fn item(qty: u32) -> CartItem {
        CartItem {
            product_id: "P1".into(), variant_id: None, name: "Landing Door".into(), sku: "LD1".into(),
            quantity: qty, unit_price: Money::inr(Decimal::new(10, 0)),
        }
    }

    #[test]
    fn test_cart_operations() {
        let rules = PricingRules { minimum_order_quantity: 2, ..PricingRules::default() };
        let decision = PricingVisibilityResolver::resolve(AccountClassification::BusinessVerified, Some(&rules));
        let mut cart = Cart::for_customer(Uuid::new_v4(), "INR");
        cart.add_item(item(2), &decision).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(20, 0));
        cart.add_item(item(1), &decision).unwrap();
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        assert!(matches!(cart.update_quantity("P1", 1, &decision), Err(CartError::BelowMinimumOrder { minimum: 2 })));
        cart.update_quantity("P1", 0, &decision).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_below_moq_rejected() {
        let rules = PricingRules { minimum_order_quantity: 5, ..PricingRules::default() };
        let decision = PricingVisibilityResolver::resolve(AccountClassification::BusinessVerified, Some(&rules));
        let mut cart = Cart::for_customer(Uuid::new_v4(), "INR");
        assert!(matches!(cart.add_item(item(4), &decision), Err(CartError::BelowMinimumOrder { minimum: 5 })));
    }

    #[test]
    fn test_quote_only_callers_cannot_add() {
        let rules = PricingRules { business_verified_can_buy: false, ..PricingRules::default() };
        let mut cart = Cart::for_customer(Uuid::new_v4(), "INR");
        for c in [AccountClassification::Individual, AccountClassification::BusinessUnverified, AccountClassification::BusinessVerified] {
            let decision = PricingVisibilityResolver::resolve(c, Some(&rules));
            assert!(matches!(cart.add_item(item(1), &decision), Err(CartError::CheckoutNotAllowed(_))));
        }
        assert!(cart.is_empty());
    }

    #[test]
    fn test_lost_checkout_rights_freeze_quantities() {
        let rules = PricingRules::default();
        let buyer = PricingVisibilityResolver::resolve(AccountClassification::BusinessVerified, Some(&rules));
        let mut cart = Cart::for_customer(Uuid::new_v4(), "INR");
        cart.add_item(item(2), &buyer).unwrap();

        let revoked = PricingVisibilityResolver::resolve(AccountClassification::BusinessVerified, Some(&PricingRules { business_verified_can_buy: false, ..rules }));
        assert!(matches!(cart.update_quantity("P1", 5, &revoked), Err(CartError::CheckoutNotAllowed(_))));
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_merged_quantity_overflow() {
        let decision = PricingVisibilityResolver::resolve(AccountClassification::BusinessVerified, Some(&PricingRules::default()));
        let mut cart = Cart::for_customer(Uuid::new_v4(), "INR");
        cart.add_item(item(u32::MAX), &decision).unwrap();
        assert!(matches!(cart.add_item(item(1), &decision), Err(CartError::QuantityTooLarge)));
        assert_eq!(cart.items()[0].quantity, u32::MAX);
    }

    #[test]
    fn test_subtotal_overflow_leaves_cart_unchanged() {
        let decision = PricingVisibilityResolver::resolve(AccountClassification::BusinessVerified, Some(&PricingRules::default()));
        let mut cart = Cart::for_customer(Uuid::new_v4(), "INR");
        let pricey = CartItem { unit_price: Money::inr(Decimal::MAX), ..item(1) };
        cart.add_item(pricey, &decision).unwrap();
        assert!(matches!(cart.update_quantity("P1", 3, &decision), Err(CartError::Money(MoneyError::Overflow))));
        assert_eq!(cart.items()[0].quantity, 1);
        assert_eq!(cart.subtotal().amount(), Decimal::MAX);
    }
}
