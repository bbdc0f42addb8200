//! In-memory repositories for tests and local runs without Postgres.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::aggregates::{Order, Quote};
use crate::domain::pricing::{BusinessProfile, PricingRuleSet, PricingRules};
use crate::domain::repository::{BusinessProfileRepository, QuoteRepository, RepositoryError, RuleSetRepository};

#[derive(Default)]
pub struct InMemoryRuleSetRepository {
    current: RwLock<Option<PricingRuleSet>>,
}

impl InMemoryRuleSetRepository {
    pub fn with_rules(rule_set: PricingRuleSet) -> Self {
        Self { current: RwLock::new(Some(rule_set)) }
    }
}

#[async_trait]
impl RuleSetRepository for InMemoryRuleSetRepository {
    async fn load(&self) -> Result<Option<PricingRuleSet>, RepositoryError> {
        Ok(self.current.read().await.clone())
    }

    async fn update(&self, expected_version: u64, rules: PricingRules) -> Result<PricingRuleSet, RepositoryError> {
        let mut guard = self.current.write().await;
        let base = guard.clone().unwrap_or_else(|| PricingRuleSet { version: 0, ..PricingRuleSet::initial() });
        let next = base.apply_update(expected_version, rules)?;
        *guard = Some(next.clone());
        Ok(next)
    }
}

#[derive(Default)]
pub struct InMemoryBusinessProfileRepository {
    profiles: RwLock<HashMap<Uuid, BusinessProfile>>,
}

impl InMemoryBusinessProfileRepository {
    pub async fn upsert(&self, profile: BusinessProfile) {
        self.profiles.write().await.insert(profile.user_id, profile);
    }
}

#[async_trait]
impl BusinessProfileRepository for InMemoryBusinessProfileRepository {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<BusinessProfile>, RepositoryError> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<Uuid, Quote>>,
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl InMemoryQuoteRepository {
    pub async fn order(&self, id: Uuid) -> Option<Order> {
        self.orders.read().await.get(&id).cloned()
    }

    pub async fn orders_for_quote(&self, quote_id: Uuid) -> Vec<Order> {
        self.orders.read().await.values().filter(|o| o.quote_id() == Some(quote_id)).cloned().collect()
    }
}

#[async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError> {
        self.quotes.write().await.insert(quote.id(), quote.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Quote>, RepositoryError> {
        Ok(self.quotes.read().await.get(&id).cloned())
    }

    async fn save(&self, quote: &Quote) -> Result<u64, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let version = next_version(&quotes, quote)?;
        let mut stored = quote.clone();
        stored.persisted_as(version);
        quotes.insert(quote.id(), stored);
        Ok(version)
    }

    async fn save_conversion(&self, quote: &Quote, order: &Order) -> Result<u64, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let version = next_version(&quotes, quote)?;
        let mut orders = self.orders.write().await;
        if orders.values().any(|o| o.quote_id() == Some(quote.id())) {
            return Err(RepositoryError::Conflict(format!("quote {}", quote.id())));
        }
        orders.insert(order.id(), order.clone());
        let mut stored = quote.clone();
        stored.persisted_as(version);
        quotes.insert(quote.id(), stored);
        Ok(version)
    }
}

fn next_version(quotes: &HashMap<Uuid, Quote>, quote: &Quote) -> Result<u64, RepositoryError> {
    match quotes.get(&quote.id()) {
        Some(stored) if stored.version() == quote.version() => Ok(quote.version() + 1),
        Some(_) => Err(RepositoryError::Conflict(format!("quote {}", quote.id()))),
        None => Err(RepositoryError::Corrupt(format!("quote {} was never inserted", quote.id()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::RuleSetError;

    #[tokio::test]
    async fn test_rule_set_optimistic_update() {
        let repo = InMemoryRuleSetRepository::with_rules(PricingRuleSet::initial());
        let mut rules = PricingRules::default();
        rules.guest_price_visible = true;
        let updated = repo.update(1, rules.clone()).await.unwrap();
        assert_eq!(updated.version, 2);

        let stale = repo.update(1, rules).await.unwrap_err();
        assert!(matches!(stale, RepositoryError::RuleSet(RuleSetError::VersionConflict { expected: 1, actual: 2 })));
        assert!(repo.load().await.unwrap().unwrap().rules.guest_price_visible);
    }

    #[tokio::test]
    async fn test_first_update_on_empty_store() {
        let repo = InMemoryRuleSetRepository::default();
        assert!(repo.load().await.unwrap().is_none());
        let created = repo.update(0, PricingRules::default()).await.unwrap();
        assert_eq!(created.version, 1);
    }
}
