//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::pricing::AccountClassification;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Quote(QuoteEvent),
    Order(OrderEvent),
    Pricing(PricingEvent),
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        match self {
            Self::Quote(e) => format!("cedar.quote.{}", e.name()),
            Self::Order(e) => format!("cedar.order.{}", e.name()),
            Self::Pricing(_) => "cedar.pricing.rules_updated".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QuoteEvent {
    Submitted { quote_id: Uuid, quote_number: String, classification: AccountClassification },
    Priced { quote_id: Uuid, total: Decimal },
    Accepted { quote_id: Uuid },
    Converted { quote_id: Uuid, order_id: Uuid },
}

impl QuoteEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "submitted",
            Self::Priced { .. } => "priced",
            Self::Accepted { .. } => "accepted",
            Self::Converted { .. } => "converted",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, order_number: String, quote_id: Option<Uuid>, total: Decimal },
}

impl OrderEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PricingEvent {
    RulesUpdated { version: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects() {
        let e = DomainEvent::Quote(QuoteEvent::Accepted { quote_id: Uuid::nil() });
        assert_eq!(e.subject(), "cedar.quote.accepted");
        let e = DomainEvent::Pricing(PricingEvent::RulesUpdated { version: 3 });
        assert_eq!(e.subject(), "cedar.pricing.rules_updated");
    }
}
