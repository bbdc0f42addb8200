//! Quote submission, admin pricing, acceptance and conversion.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::PricingService;
use crate::domain::aggregates::{Order, PriceEdit, Quote, QuoteItem, QuoteSubmission};
use crate::domain::pricing::AccountClassification;
use crate::domain::repository::QuoteRepository;
use crate::infrastructure::EventPublisher;
use crate::{CommerceError, Result};

/// Identity of the caller as established by the HTTP layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<Uuid>,
    pub is_admin: bool,
}

impl Caller {
    pub fn guest() -> Self { Self::default() }
    pub fn user(id: Uuid) -> Self { Self { user_id: Some(id), is_admin: false } }
    pub fn admin() -> Self { Self { user_id: None, is_admin: true } }
}

#[derive(Clone)]
pub struct QuoteService {
    quotes: Arc<dyn QuoteRepository>,
    pricing: PricingService,
    events: Arc<dyn EventPublisher>,
    currency: String,
}

impl QuoteService {
    pub fn new(
        quotes: Arc<dyn QuoteRepository>,
        pricing: PricingService,
        events: Arc<dyn EventPublisher>,
        currency: impl Into<String>,
    ) -> Self {
        Self { quotes, pricing, events, currency: currency.into() }
    }

    pub fn currency(&self) -> &str { &self.currency }

    pub async fn submit(&self, caller: Caller, mut submission: QuoteSubmission) -> Result<Quote> {
        submission.customer.user_id = caller.user_id;
        let classification = match self.pricing.classify(caller.user_id).await {
            Some(c) => c,
            None if caller.user_id.is_some() => AccountClassification::Individual,
            None => AccountClassification::Guest,
        };
        let rules = self.pricing.rule_cache().rules_or_conservative().await;
        let mut quote = Quote::submit(submission, classification, &rules, &self.currency)?;
        self.quotes.insert(&quote).await?;
        info!(quote_id = %quote.id(), quote_number = quote.quote_number(), %classification, "quote submitted");
        self.events.publish(quote.take_events()).await;
        Ok(quote)
    }

    pub async fn get(&self, caller: Caller, id: Uuid) -> Result<Quote> {
        let quote = self.load(id).await?;
        ensure_visible(&caller, &quote)?;
        Ok(quote)
    }

    /// Admin pricing of one line, capped by the current discount cap.
    pub async fn price_item(&self, id: Uuid, item_id: Uuid, edit: PriceEdit) -> Result<QuoteItem> {
        let mut quote = self.load(id).await?;
        let rules = self.pricing.rule_cache().rules_or_conservative().await;
        let item = quote.price_item(item_id, edit, &rules)?.clone();
        self.quotes.save(&quote).await?;
        info!(quote_id = %id, %item_id, "quote item priced");
        Ok(item)
    }

    pub async fn mark_priced(&self, id: Uuid, admin_notes: Option<String>) -> Result<Quote> {
        let mut quote = self.load(id).await?;
        let rules = self.pricing.rule_cache().rules_or_conservative().await;
        if admin_notes.is_some() {
            quote.set_admin_notes(admin_notes);
        }
        quote.mark_priced(&rules.tax)?;
        let version = self.quotes.save(&quote).await?;
        quote.persisted_as(version);
        info!(quote_id = %id, "quote priced");
        self.events.publish(quote.take_events()).await;
        Ok(quote)
    }

    pub async fn accept(&self, caller: Caller, id: Uuid) -> Result<Quote> {
        let mut quote = self.load(id).await?;
        ensure_owner(&caller, &quote)?;
        quote.accept()?;
        let version = self.quotes.save(&quote).await?;
        quote.persisted_as(version);
        info!(quote_id = %id, "quote accepted");
        self.events.publish(quote.take_events()).await;
        Ok(quote)
    }

    pub async fn convert(&self, caller: Caller, id: Uuid) -> Result<(Quote, Order)> {
        let mut quote = self.load(id).await?;
        ensure_owner(&caller, &quote)?;
        let order = quote.convert_to_order(Order::next_number(Utc::now()))?;
        let version = self.quotes.save_conversion(&quote, &order).await?;
        quote.persisted_as(version);
        info!(quote_id = %id, order_id = %order.id(), order_number = order.order_number(), "quote converted to order");
        self.events.publish(quote.take_events()).await;
        Ok((quote, order))
    }

    async fn load(&self, id: Uuid) -> Result<Quote> {
        self.quotes.get(id).await?.ok_or(CommerceError::QuoteNotFound(id))
    }
}

fn ensure_visible(caller: &Caller, quote: &Quote) -> Result<()> {
    if caller.is_admin { return Ok(()); }
    ensure_owner(caller, quote)
}

/// Guest quotes have no owner and can only be handled by an admin.
fn ensure_owner(caller: &Caller, quote: &Quote) -> Result<()> {
    match caller.user_id {
        Some(user) if quote.is_owned_by(user) => Ok(()),
        _ => Err(CommerceError::Forbidden("quote belongs to another customer".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{QuoteCustomer, QuoteError, QuoteItemRequest, QuoteStatus};
    use crate::domain::pricing::{PricingRuleSet, ProfileClassificationProvider};
    use crate::domain::value_objects::{Money, Percentage};
    use crate::domain::repository::RepositoryError;
    use crate::infrastructure::{InMemoryBusinessProfileRepository, InMemoryQuoteRepository, InMemoryRuleSetRepository, LogPublisher};
    use rust_decimal::Decimal;

    fn service() -> (QuoteService, Arc<InMemoryQuoteRepository>) {
        let quotes = Arc::new(InMemoryQuoteRepository::default());
        (service_over(quotes.clone()), quotes)
    }

    fn service_over(quotes: Arc<dyn QuoteRepository>) -> QuoteService {
        let events: Arc<dyn EventPublisher> = Arc::new(LogPublisher);
        let classifier = Arc::new(ProfileClassificationProvider::new(Arc::new(InMemoryBusinessProfileRepository::default())));
        let rules = Arc::new(InMemoryRuleSetRepository::with_rules(PricingRuleSet::initial()));
        let pricing = PricingService::new(classifier, rules, events.clone());
        QuoteService::new(quotes, pricing, events, "INR")
    }

    /// Yields after every read so concurrent requests interleave the way they do against a real database.
    struct YieldingQuotes(Arc<InMemoryQuoteRepository>);

    #[async_trait::async_trait]
    impl QuoteRepository for YieldingQuotes {
        async fn insert(&self, quote: &Quote) -> std::result::Result<(), RepositoryError> { self.0.insert(quote).await }
        async fn get(&self, id: Uuid) -> std::result::Result<Option<Quote>, RepositoryError> {
            let quote = self.0.get(id).await;
            tokio::task::yield_now().await;
            quote
        }
        async fn save(&self, quote: &Quote) -> std::result::Result<u64, RepositoryError> { self.0.save(quote).await }
        async fn save_conversion(&self, quote: &Quote, order: &Order) -> std::result::Result<u64, RepositoryError> {
            self.0.save_conversion(quote, order).await
        }
    }

    async fn priced_quote(service: &QuoteService, user: Uuid) -> Quote {
        let quote = service.submit(Caller::user(user), submission()).await.unwrap();
        let item_id = quote.items()[0].id;
        service.price_item(quote.id(), item_id, PriceEdit::Discount { percentage: Percentage::zero() }).await.unwrap();
        service.mark_priced(quote.id(), None).await.unwrap()
    }

    fn submission() -> QuoteSubmission {
        QuoteSubmission {
            customer: QuoteCustomer { user_id: None, name: "Ravi".into(), email: "ravi@example.in".into(), phone: None, company: None },
            items: vec![QuoteItemRequest {
                product_id: "motor".into(), variant_id: None, name: "Traction Motor".into(), sku: None,
                quantity: 2, list_price: Some(Money::inr(Decimal::new(5000, 0))),
            }],
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_full_flow() {
        let (service, repo) = service();
        let user = Uuid::new_v4();
        let quote = service.submit(Caller::user(user), submission()).await.unwrap();
        assert_eq!(quote.classification(), AccountClassification::Individual);
        assert_eq!(quote.customer().user_id, Some(user));

        let item_id = quote.items()[0].id;
        let over = PriceEdit::Discount { percentage: Percentage::whole(25) };
        let err = service.price_item(quote.id(), item_id, over).await.unwrap_err();
        assert!(matches!(err, CommerceError::Quote(QuoteError::DiscountCapExceeded { .. })));

        service.price_item(quote.id(), item_id, PriceEdit::Discount { percentage: Percentage::whole(10) }).await.unwrap();
        let priced = service.mark_priced(quote.id(), Some("Includes installation".into())).await.unwrap();
        assert_eq!(priced.status(), QuoteStatus::Priced);
        // 4500 x 2 = 9000, GST 1620
        assert_eq!(priced.totals().unwrap().total.amount(), Decimal::new(10620, 0));

        assert!(matches!(service.accept(Caller::user(Uuid::new_v4()), quote.id()).await, Err(CommerceError::Forbidden(_))));
        service.accept(Caller::user(user), quote.id()).await.unwrap();
        let (converted, order) = service.convert(Caller::user(user), quote.id()).await.unwrap();
        assert_eq!(converted.status(), QuoteStatus::Converted);
        assert!(repo.order(order.id()).await.is_some());
    }

    #[tokio::test]
    async fn test_guest_quote_visible_to_admin_only() {
        let (service, _) = service();
        let quote = service.submit(Caller::guest(), submission()).await.unwrap();
        assert_eq!(quote.classification(), AccountClassification::Guest);
        assert!(service.get(Caller::admin(), quote.id()).await.is_ok());
        assert!(matches!(service.get(Caller::guest(), quote.id()).await, Err(CommerceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_missing_quote() {
        let (service, _) = service();
        assert!(matches!(service.get(Caller::admin(), Uuid::new_v4()).await, Err(CommerceError::QuoteNotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_conversions_create_one_order() {
        let repo = Arc::new(InMemoryQuoteRepository::default());
        let service = service_over(Arc::new(YieldingQuotes(repo.clone())));
        let user = Uuid::new_v4();
        let quote = priced_quote(&service, user).await;
        service.accept(Caller::user(user), quote.id()).await.unwrap();

        let (a, b) = tokio::join!(service.convert(Caller::user(user), quote.id()), service.convert(Caller::user(user), quote.id()));
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert!(matches!(a.err().or(b.err()), Some(CommerceError::Conflict(_))));
        assert_eq!(repo.orders_for_quote(quote.id()).await.len(), 1);
        assert_eq!(service.get(Caller::admin(), quote.id()).await.unwrap().status(), QuoteStatus::Converted);
    }

    #[tokio::test]
    async fn test_concurrent_line_edits_do_not_overwrite() {
        let repo = Arc::new(InMemoryQuoteRepository::default());
        let service = service_over(Arc::new(YieldingQuotes(repo.clone())));
        let mut request = submission();
        let mut second = request.items[0].clone();
        second.product_id = "governor".into();
        request.items.push(second);
        let quote = service.submit(Caller::user(Uuid::new_v4()), request).await.unwrap();
        let (first_id, second_id) = (quote.items()[0].id, quote.items()[1].id);

        let ten = PriceEdit::Discount { percentage: Percentage::whole(10) };
        let (a, b) = tokio::join!(
            service.price_item(quote.id(), first_id, ten.clone()),
            service.price_item(quote.id(), second_id, ten),
        );
        assert!(a.is_ok() != b.is_ok());
        let stored = service.get(Caller::admin(), quote.id()).await.unwrap();
        let priced = stored.items().iter().filter(|i| i.unit_price.is_some()).count();
        assert_eq!(priced, 1);
        assert_eq!(stored.version(), 2);
    }

    #[tokio::test]
    async fn test_stale_copy_cannot_be_saved() {
        let (service, repo) = service();
        let user = Uuid::new_v4();
        let quote = priced_quote(&service, user).await;
        let stale = repo.get(quote.id()).await.unwrap().unwrap();
        service.accept(Caller::user(user), quote.id()).await.unwrap();
        assert!(matches!(repo.save(&stale).await, Err(RepositoryError::Conflict(_))));
    }
}
