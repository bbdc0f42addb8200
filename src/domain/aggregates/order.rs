//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Money, MoneyError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    order_number: String,
    quote_id: Option<Uuid>,
    customer_id: Option<Uuid>,
    email: String,
    items: Vec<LineItem>,
    subtotal: Money,
    tax: Money,
    total: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

impl Order {
    pub fn create(
        order_number: impl Into<String>,
        quote_id: Option<Uuid>,
        customer_id: Option<Uuid>,
        email: impl Into<String>,
        currency: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), order_number: order_number.into(), quote_id, customer_id, email: email.into(),
            items: vec![], subtotal: Money::zero(currency), tax: Money::zero(currency), total: Money::zero(currency),
            created_at: now, updated_at: now,
        }
    }

    /// Order numbers look like `ORD-20250101-1A2B3C`.
    pub fn next_number(at: DateTime<Utc>) -> String {
        let simple = Uuid::new_v4().simple().to_string();
        format!("ORD-{}-{}", at.format("%Y%m%d"), simple[..6].to_uppercase())
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn quote_id(&self) -> Option<Uuid> { self.quote_id }
    pub fn customer_id(&self) -> Option<Uuid> { self.customer_id }
    pub fn email(&self) -> &str { &self.email }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn tax(&self) -> &Money { &self.tax }
    pub fn total(&self) -> &Money { &self.total }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn add_item(&mut self, item: LineItem) -> Result<(), OrderError> {
        if item.total.currency() != self.subtotal.currency() { return Err(OrderError::Money(MoneyError::CurrencyMismatch)); }
        self.items.push(item);
        self.recalculate()
    }

    pub fn set_tax(&mut self, tax: Money) -> Result<(), OrderError> {
        if tax.currency() != self.subtotal.currency() { return Err(OrderError::Money(MoneyError::CurrencyMismatch)); }
        self.tax = tax;
        self.recalculate()
    }

    fn recalculate(&mut self) -> Result<(), OrderError> {
        let mut subtotal = Money::zero(self.subtotal.currency());
        for item in &self.items {
            subtotal = subtotal.add(&item.total)?;
        }
        self.total = subtotal.add(&self.tax)?;
        self.subtotal = subtotal;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OrderError {
    #[error(transparent)]
    Money(#[from] MoneyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_order_totals() {
        let mut order = Order::create("ORD-1", None, None, "buyer@liftco.in", "INR");
        let price = Money::inr(Decimal::new(10, 0));
        order.add_item(LineItem {
            id: Uuid::new_v4(), product_id: "P1".into(), variant_id: None, name: "Guide Shoe".into(), sku: None,
            quantity: 2, unit_price: price.clone(), total: price.multiply(2).unwrap(),
        }).unwrap();
        order.set_tax(Money::inr(Decimal::new(36, 1))).unwrap();
        assert_eq!(order.subtotal().amount(), Decimal::new(20, 0));
        assert_eq!(order.total().amount(), Decimal::new(236, 1));
    }

    #[test]
    fn test_currency_mismatch() {
        let mut order = Order::create("ORD-1", None, None, "buyer@liftco.in", "INR");
        assert!(order.set_tax(Money::new(Decimal::ONE, "USD")).is_err());
    }

    #[test]
    fn test_order_number_format() {
        let n = Order::next_number(Utc::now());
        assert!(n.starts_with("ORD-"));
        assert_eq!(n.len(), "ORD-20250101-1A2B3C".len());
    }
}
