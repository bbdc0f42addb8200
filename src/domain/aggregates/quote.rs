//! Quote Aggregate
//!
//! A quote is submitted by a customer (or a guest), priced line by line by an
//! admin within the discount cap, accepted by the customer and finally
//! converted into an order. Status only ever moves forward:
//! `pending -> priced -> accepted -> converted`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::order::{LineItem, Order};
use crate::domain::events::{DomainEvent, OrderEvent, QuoteEvent};
use crate::domain::pricing::{AccountClassification, PricingRules, TaxSettings};
use crate::domain::value_objects::{Money, MoneyError, Percentage};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Pending,
    Priced,
    Accepted,
    Converted,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Priced => "priced",
            Self::Accepted => "accepted",
            Self::Converted => "converted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "priced" => Some(Self::Priced),
            "accepted" => Some(Self::Accepted),
            "converted" => Some(Self::Converted),
            _ => None,
        }
    }

    fn is_editable(&self) -> bool { matches!(self, Self::Pending | Self::Priced) }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Who asked for the quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCustomer {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub id: Uuid,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: u32,
    /// Catalogue price at submission time, if known.
    pub list_price: Option<Money>,
    pub unit_price: Option<Money>,
    pub discount_percentage: Option<Percentage>,
    pub total: Option<Money>,
}

/// Line requested by the customer.
#[derive(Clone, Debug)]
pub struct QuoteItemRequest {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: u32,
    pub list_price: Option<Money>,
}

#[derive(Clone, Debug)]
pub struct QuoteSubmission {
    pub customer: QuoteCustomer,
    pub items: Vec<QuoteItemRequest>,
    pub notes: Option<String>,
}

/// How an admin prices a line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriceEdit {
    Discount { percentage: Percentage },
    UnitPrice { amount: Money },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl QuoteTotals {
    /// subtotal = sum(unit x qty); tax = subtotal x GST when enabled; total = subtotal + tax.
    pub fn compute<'a>(
        lines: impl IntoIterator<Item = (&'a Money, u32)>,
        tax: &TaxSettings,
        currency: &str,
    ) -> Result<Self, MoneyError> {
        let mut subtotal = Money::zero(currency);
        for (unit, qty) in lines {
            subtotal = subtotal.add(&unit.multiply(qty)?)?;
        }
        let tax = if tax.enabled { subtotal.percent(&tax.gst_rate_percentage)?.rounded() } else { Money::zero(currency) };
        let total = subtotal.add(&tax)?;
        Ok(Self { subtotal, tax, total })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quote {
    id: Uuid,
    quote_number: String,
    /// Bumped by every successful write; stale writers get a conflict.
    version: u64,
    customer: QuoteCustomer,
    classification: AccountClassification,
    status: QuoteStatus,
    items: Vec<QuoteItem>,
    currency: String,
    totals: Option<QuoteTotals>,
    customer_notes: Option<String>,
    admin_notes: Option<String>,
    order_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Quote {
    /// Validates and opens a new quote in `pending` status.
    pub fn submit(
        submission: QuoteSubmission,
        classification: AccountClassification,
        rules: &PricingRules,
        currency: &str,
    ) -> Result<Self, QuoteError> {
        let QuoteSubmission { customer, items, notes } = submission;
        if customer.name.trim().is_empty() {
            return Err(QuoteError::MissingContact("name"));
        }
        if !validator::validate_email(customer.email.as_str()) {
            return Err(QuoteError::InvalidEmail(customer.email));
        }
        if items.is_empty() {
            return Err(QuoteError::NoItems);
        }
        let minimum = rules.minimum_order_quantity.max(1);
        let items = items
            .into_iter()
            .map(|r| {
                if r.quantity < minimum {
                    return Err(QuoteError::BelowMinimumOrder { product_id: r.product_id, minimum });
                }
                if let Some(list) = &r.list_price {
                    if list.currency() != currency { return Err(QuoteError::Money(MoneyError::CurrencyMismatch)); }
                    if list.is_negative() { return Err(QuoteError::NegativePrice); }
                }
                Ok(QuoteItem {
                    id: Uuid::new_v4(), product_id: r.product_id, variant_id: r.variant_id, name: r.name, sku: r.sku,
                    quantity: r.quantity, list_price: r.list_price, unit_price: None, discount_percentage: None, total: None,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let id = Uuid::now_v7();
        let now = Utc::now();
        let quote_number = quote_number(&id, now);
        let mut quote = Self {
            id, quote_number: quote_number.clone(), version: 1, customer, classification, status: QuoteStatus::Pending, items,
            currency: currency.to_string(), totals: None, customer_notes: notes, admin_notes: None, order_id: None,
            created_at: now, updated_at: now, events: vec![],
        };
        quote.raise_event(DomainEvent::Quote(QuoteEvent::Submitted { quote_id: id, quote_number, classification }));
        Ok(quote)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn quote_number(&self) -> &str { &self.quote_number }
    pub fn version(&self) -> u64 { self.version }
    pub fn customer(&self) -> &QuoteCustomer { &self.customer }
    pub fn classification(&self) -> AccountClassification { self.classification }
    pub fn status(&self) -> QuoteStatus { self.status }
    pub fn items(&self) -> &[QuoteItem] { &self.items }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn totals(&self) -> Option<&QuoteTotals> { self.totals.as_ref() }
    pub fn customer_notes(&self) -> Option<&str> { self.customer_notes.as_deref() }
    pub fn admin_notes(&self) -> Option<&str> { self.admin_notes.as_deref() }
    pub fn order_id(&self) -> Option<Uuid> { self.order_id }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_fully_priced(&self) -> bool { self.items.iter().all(|i| i.unit_price.is_some()) }
    pub fn is_owned_by(&self, user_id: Uuid) -> bool { self.customer.user_id == Some(user_id) }

    /// Sets the unit price of one line, enforcing the discount cap, and recomputes totals.
    pub fn price_item(&mut self, item_id: Uuid, edit: PriceEdit, rules: &PricingRules) -> Result<&QuoteItem, QuoteError> {
        self.ensure_editable("price")?;
        let currency = self.currency.clone();
        let cap = rules.discount_cap_percentage;
        let idx = self.items.iter().position(|i| i.id == item_id).ok_or(QuoteError::ItemNotFound(item_id))?;
        let (unit_price, discount) = {
            let item = &self.items[idx];
            resolve_edit(item.list_price.as_ref(), edit, &currency)?
        };
        if let Some(d) = discount {
            if d.value() > cap.value() {
                return Err(QuoteError::DiscountCapExceeded { requested: d.value(), cap: cap.value() });
            }
        }
        let line_total = unit_price.multiply(self.items[idx].quantity)?;
        let previous = self.items[idx].clone();
        let item = &mut self.items[idx];
        item.total = Some(line_total);
        item.unit_price = Some(unit_price);
        item.discount_percentage = discount;
        if let Err(e) = self.recalculate(&rules.tax) {
            self.items[idx] = previous;
            return Err(e);
        }
        Ok(&self.items[idx])
    }

    pub fn set_admin_notes(&mut self, notes: Option<String>) {
        self.admin_notes = notes;
        self.touch();
    }

    /// Moves the quote to `priced` once every line has a unit price.
    pub fn mark_priced(&mut self, tax: &TaxSettings) -> Result<(), QuoteError> {
        self.ensure_editable("mark priced")?;
        if !self.is_fully_priced() {
            return Err(QuoteError::UnpricedItems);
        }
        self.recalculate(tax)?;
        self.status = QuoteStatus::Priced;
        let total = self.totals.as_ref().map(|t| t.total.amount()).unwrap_or(Decimal::ZERO);
        self.raise_event(DomainEvent::Quote(QuoteEvent::Priced { quote_id: self.id, total }));
        Ok(())
    }

    pub fn accept(&mut self) -> Result<(), QuoteError> {
        if self.status != QuoteStatus::Priced {
            return Err(QuoteError::InvalidTransition { from: self.status, action: "accept" });
        }
        self.status = QuoteStatus::Accepted;
        self.touch();
        self.raise_event(DomainEvent::Quote(QuoteEvent::Accepted { quote_id: self.id }));
        Ok(())
    }

    /// Creates the order for an accepted (or priced) quote.
    pub fn convert_to_order(&mut self, order_number: impl Into<String>) -> Result<Order, QuoteError> {
        if !matches!(self.status, QuoteStatus::Priced | QuoteStatus::Accepted) {
            return Err(QuoteError::InvalidTransition { from: self.status, action: "convert" });
        }
        let totals = self.totals.clone().ok_or(QuoteError::UnpricedItems)?;
        let mut order = Order::create(order_number, Some(self.id), self.customer.user_id, &self.customer.email, &self.currency);
        for item in &self.items {
            let (Some(unit_price), Some(total)) = (item.unit_price.clone(), item.total.clone()) else {
                return Err(QuoteError::UnpricedItems);
            };
            order.add_item(LineItem {
                id: Uuid::new_v4(), product_id: item.product_id.clone(), variant_id: item.variant_id.clone(),
                name: item.name.clone(), sku: item.sku.clone(), quantity: item.quantity, unit_price, total,
            })?;
        }
        order.set_tax(totals.tax)?;
        self.order_id = Some(order.id());
        self.status = QuoteStatus::Converted;
        self.touch();
        self.raise_event(DomainEvent::Quote(QuoteEvent::Converted { quote_id: self.id, order_id: order.id() }));
        self.raise_event(DomainEvent::Order(OrderEvent::Created {
            order_id: order.id(), order_number: order.order_number().to_string(), quote_id: Some(self.id),
            total: order.total().amount(),
        }));
        Ok(order)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }

    /// Records the version the repository stored this quote under.
    pub(crate) fn persisted_as(&mut self, version: u64) { self.version = version; }

    fn ensure_editable(&self, action: &'static str) -> Result<(), QuoteError> {
        if self.status.is_editable() { Ok(()) } else { Err(QuoteError::InvalidTransition { from: self.status, action }) }
    }

    fn recalculate(&mut self, tax: &TaxSettings) -> Result<(), QuoteError> {
        let priced = self.items.iter().filter_map(|i| i.unit_price.as_ref().map(|p| (p, i.quantity)));
        self.totals = Some(QuoteTotals::compute(priced, tax, &self.currency)?);
        self.touch();
        Ok(())
    }

    /// Rebuilds a quote from storage.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: Uuid, quote_number: String, version: u64, customer: QuoteCustomer, classification: AccountClassification,
        status: QuoteStatus, items: Vec<QuoteItem>, currency: String, totals: Option<QuoteTotals>,
        customer_notes: Option<String>, admin_notes: Option<String>, order_id: Option<Uuid>,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id, quote_number, version, customer, classification, status, items, currency, totals, customer_notes,
            admin_notes, order_id, created_at, updated_at, events: vec![],
        }
    }
}

fn quote_number(id: &Uuid, at: DateTime<Utc>) -> String {
    let simple = id.simple().to_string();
    let suffix = &simple[simple.len() - 6..];
    format!("QT-{}-{}", at.format("%Y%m%d"), suffix.to_uppercase())
}

/// Unit price and implied discount for an edit against the line's list price.
fn resolve_edit(list_price: Option<&Money>, edit: PriceEdit, currency: &str) -> Result<(Money, Option<Percentage>), QuoteError> {
    match edit {
        PriceEdit::Discount { percentage } => {
            let list = list_price.ok_or(QuoteError::NoListPrice)?;
            Ok((list.discounted(&percentage)?, Some(percentage)))
        }
        PriceEdit::UnitPrice { amount } => {
            if amount.currency() != currency {
                return Err(QuoteError::Money(MoneyError::CurrencyMismatch));
            }
            if amount.is_negative() {
                return Err(QuoteError::NegativePrice);
            }
            let Some(list) = list_price.filter(|l| !l.amount().is_zero()) else {
                return Ok((amount, None));
            };
            if amount.amount() > list.amount() {
                return Err(QuoteError::PriceAboveList);
            }
            let discount = (list.amount() - amount.amount()) / list.amount() * Decimal::ONE_HUNDRED;
            let discount = Percentage::new(discount).map_err(|_| QuoteError::PriceAboveList)?;
            Ok((amount, Some(discount)))
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum QuoteError {
    #[error("A quote needs at least one item")]
    NoItems,
    #[error("Contact {0} is required")]
    MissingContact(&'static str),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Quantity for {product_id} is below the minimum order quantity of {minimum}")]
    BelowMinimumOrder { product_id: String, minimum: u32 },
    #[error("Quote item not found: {0}")]
    ItemNotFound(Uuid),
    #[error("Cannot {action} a quote that is {from}")]
    InvalidTransition { from: QuoteStatus, action: &'static str },
    #[error("Discount of {requested}% exceeds the allowed maximum of {cap}%")]
    DiscountCapExceeded { requested: Decimal, cap: Decimal },
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Unit price cannot exceed the list price")]
    PriceAboveList,
    #[error("Line has no list price; set a unit price instead")]
    NoListPrice,
    #[error("Every item must be priced first")]
    UnpricedItems,
    #[error(transparent)]
    Money(#[from] MoneyError),
    #[error(transparent)]
    Order(#[from] crate::domain::aggregates::order::OrderError),
}
