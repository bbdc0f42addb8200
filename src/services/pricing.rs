//! Request-scoped pricing decisions.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem, Product};
use crate::domain::events::{DomainEvent, PricingEvent};
use crate::domain::pricing::{
    AccountClassification, ClassificationProvider, PricingDecision, PricingRuleSet, PricingRules,
    PricingVisibilityResolver, ProductPricingView,
};
use crate::domain::repository::RuleSetRepository;
use crate::infrastructure::EventPublisher;
use crate::Result;

/// Loads the rule set at most once per request. A failed or empty load is
/// remembered as `None` so the whole request resolves against the same rules.
pub struct RuleSetCache {
    repository: Arc<dyn RuleSetRepository>,
    cell: OnceCell<Option<PricingRuleSet>>,
}

impl RuleSetCache {
    pub fn new(repository: Arc<dyn RuleSetRepository>) -> Self {
        Self { repository, cell: OnceCell::new() }
    }

    pub async fn get(&self) -> Option<&PricingRuleSet> {
        self.cell
            .get_or_init(|| async {
                match self.repository.load().await {
                    Ok(Some(rules)) => Some(rules),
                    Ok(None) => {
                        warn!("pricing rules not initialised, using conservative defaults");
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to load pricing rules, using conservative defaults");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    /// Loaded rules, or the conservative fallback.
    pub async fn rules_or_conservative(&self) -> PricingRules {
        self.get().await.map(|r| r.rules.clone()).unwrap_or_else(PricingRules::conservative)
    }
}

#[derive(Clone)]
pub struct PricingService {
    classifier: Arc<dyn ClassificationProvider>,
    rules: Arc<dyn RuleSetRepository>,
    events: Arc<dyn EventPublisher>,
}

impl PricingService {
    pub fn new(
        classifier: Arc<dyn ClassificationProvider>,
        rules: Arc<dyn RuleSetRepository>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self { classifier, rules, events }
    }

    /// Fresh per-request rule set cache.
    pub fn rule_cache(&self) -> RuleSetCache { RuleSetCache::new(self.rules.clone()) }

    /// Classification of the caller. `None` when the lookup failed.
    pub async fn classify(&self, user_id: Option<Uuid>) -> Option<AccountClassification> {
        match self.classifier.classify(user_id).await {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(?user_id, error = %e, "classification lookup failed");
                None
            }
        }
    }

    /// Decision for the caller. Never fails: lookup errors degrade to hidden prices and quote-only.
    pub async fn decide(&self, user_id: Option<Uuid>, cache: &RuleSetCache) -> PricingDecision {
        let Some(classification) = self.classify(user_id).await else {
            let fallback = if user_id.is_some() { AccountClassification::Individual } else { AccountClassification::Guest };
            return PricingVisibilityResolver::fail_safe(fallback);
        };
        PricingVisibilityResolver::resolve(classification, cache.get().await.map(|r| &r.rules))
    }

    pub async fn product_views(
        &self,
        user_id: Option<Uuid>,
        products: &[(Product, Option<String>)],
    ) -> (PricingDecision, Vec<ProductPricingView>) {
        let cache = self.rule_cache();
        let decision = self.decide(user_id, &cache).await;
        let views = products
            .iter()
            .map(|(product, variant)| ProductPricingView::build(product, variant.as_deref(), &decision))
            .collect();
        (decision, views)
    }

    /// Builds the caller's cart from `items`, applying the checkout and minimum-order guard to every line.
    pub async fn admit_cart(&self, user_id: Uuid, items: Vec<CartItem>, currency: &str) -> Result<Cart> {
        let decision = self.decide(Some(user_id), &self.rule_cache()).await;
        let mut cart = Cart::for_customer(user_id, currency);
        for item in items {
            cart.add_item(item, &decision)?;
        }
        Ok(cart)
    }

    pub async fn current_rules(&self) -> Result<Option<PricingRuleSet>> {
        Ok(self.rules.load().await?)
    }

    pub async fn update_rules(&self, expected_version: u64, rules: PricingRules) -> Result<PricingRuleSet> {
        let updated = self.rules.update(expected_version, rules).await?;
        info!(version = updated.version, "pricing rules updated");
        self.events
            .publish(vec![DomainEvent::Pricing(PricingEvent::RulesUpdated { version: updated.version })])
            .await;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::CartError;
    use crate::domain::pricing::{AllowedAction, BusinessProfile, ProfileClassificationProvider, VerificationStatus};
    use crate::domain::repository::RepositoryError;
    use crate::infrastructure::{InMemoryBusinessProfileRepository, InMemoryRuleSetRepository, LogPublisher};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRules {
        inner: InMemoryRuleSetRepository,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl RuleSetRepository for CountingRules {
        async fn load(&self) -> std::result::Result<Option<PricingRuleSet>, RepositoryError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load().await
        }
        async fn update(&self, v: u64, r: PricingRules) -> std::result::Result<PricingRuleSet, RepositoryError> {
            self.inner.update(v, r).await
        }
    }

    struct BrokenRules;

    #[async_trait]
    impl RuleSetRepository for BrokenRules {
        async fn load(&self) -> std::result::Result<Option<PricingRuleSet>, RepositoryError> {
            Err(RepositoryError::Corrupt("boom".into()))
        }
        async fn update(&self, _: u64, _: PricingRules) -> std::result::Result<PricingRuleSet, RepositoryError> {
            Err(RepositoryError::Corrupt("boom".into()))
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl ClassificationProvider for BrokenClassifier {
        async fn classify(&self, _: Option<Uuid>) -> std::result::Result<AccountClassification, RepositoryError> {
            Err(RepositoryError::Corrupt("profile store down".into()))
        }
    }

    async fn service_with(rules: Arc<dyn RuleSetRepository>) -> (PricingService, Arc<InMemoryBusinessProfileRepository>) {
        let profiles = Arc::new(InMemoryBusinessProfileRepository::default());
        let classifier = Arc::new(ProfileClassificationProvider::new(profiles.clone()));
        (PricingService::new(classifier, rules, Arc::new(LogPublisher)), profiles)
    }

    #[tokio::test]
    async fn test_rules_loaded_once_per_request() {
        let repo = Arc::new(CountingRules { inner: InMemoryRuleSetRepository::with_rules(PricingRuleSet::initial()), loads: AtomicUsize::new(0) });
        let (service, _) = service_with(repo.clone()).await;
        let cache = service.rule_cache();
        for _ in 0..3 {
            service.decide(None, &cache).await;
        }
        assert_eq!(repo.loads.load(Ordering::SeqCst), 1);
        service.decide(None, &service.rule_cache()).await;
        assert_eq!(repo.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_verified_business_gets_cart() {
        let (service, profiles) = service_with(Arc::new(InMemoryRuleSetRepository::with_rules(PricingRuleSet::initial()))).await;
        let user = Uuid::new_v4();
        profiles.upsert(BusinessProfile {
            user_id: user, company_name: "Otis Dealers".into(), gstin: Some("27AAAAA0000A1Z5".into()),
            verification_status: VerificationStatus::Verified,
        }).await;
        let decision = service.decide(Some(user), &service.rule_cache()).await;
        assert_eq!(decision.classification, AccountClassification::BusinessVerified);
        assert_eq!(decision.allowed_action, AllowedAction::Cart);
    }

    #[tokio::test]
    async fn test_unloadable_rules_fail_safe() {
        let (service, _) = service_with(Arc::new(BrokenRules)).await;
        let d = service.decide(Some(Uuid::new_v4()), &service.rule_cache()).await;
        assert!(!d.show_price);
        assert!(!d.can_checkout);
        assert_eq!(d.allowed_action, AllowedAction::Quote);
    }

    #[tokio::test]
    async fn test_classification_failure_fail_safe() {
        let rules = Arc::new(InMemoryRuleSetRepository::with_rules(PricingRuleSet::initial()));
        let service = PricingService::new(Arc::new(BrokenClassifier), rules, Arc::new(LogPublisher));
        let d = service.decide(Some(Uuid::new_v4()), &service.rule_cache()).await;
        assert!(!d.show_price);
        assert_eq!(d.allowed_action, AllowedAction::Quote);
        let d = service.decide(None, &service.rule_cache()).await;
        assert_eq!(d.allowed_action, AllowedAction::Login);
    }

    fn cart_line(qty: u32) -> CartItem {
        CartItem {
            product_id: "buffer".into(), variant_id: None, name: "Oil Buffer".into(), sku: "BUF-1".into(),
            quantity: qty, unit_price: crate::domain::value_objects::Money::inr(rust_decimal::Decimal::new(4200, 0)),
        }
    }

    #[tokio::test]
    async fn test_cart_admission_follows_decision() {
        let (service, profiles) = service_with(Arc::new(InMemoryRuleSetRepository::with_rules(PricingRuleSet::initial()))).await;
        let buyer = Uuid::new_v4();
        profiles.upsert(BusinessProfile {
            user_id: buyer, company_name: "Kone Partners".into(), gstin: None,
            verification_status: VerificationStatus::Verified,
        }).await;
        let cart = service.admit_cart(buyer, vec![cart_line(1), cart_line(2)], "INR").await.unwrap();
        assert_eq!(cart.items()[0].quantity, 3);

        let individual = service.admit_cart(Uuid::new_v4(), vec![cart_line(1)], "INR").await;
        assert!(matches!(individual, Err(crate::CommerceError::Cart(CartError::CheckoutNotAllowed(_)))));
    }
}
