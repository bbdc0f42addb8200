//! Persistence ports for the pricing and quote domain.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Order, Quote};
use crate::domain::pricing::{BusinessProfile, PricingRuleSet, PricingRules, RuleSetError};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("{0} was modified concurrently")]
    Conflict(String),
    #[error(transparent)]
    RuleSet(#[from] RuleSetError),
}

/// Single-row store for the global pricing rule set.
#[async_trait]
pub trait RuleSetRepository: Send + Sync {
    /// Current rule set, `None` if it was never initialised.
    async fn load(&self) -> Result<Option<PricingRuleSet>, RepositoryError>;

    /// Replaces the rules if the stored version still equals `expected_version`.
    async fn update(&self, expected_version: u64, rules: PricingRules) -> Result<PricingRuleSet, RepositoryError>;
}

#[async_trait]
pub trait BusinessProfileRepository: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<BusinessProfile>, RepositoryError>;
}

/// Quote writes are compare-and-swap on `Quote::version`: a write succeeds only
/// while the stored version equals the one the quote was loaded with, and
/// returns the new version. A stale write fails with `RepositoryError::Conflict`.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError>;
    async fn get(&self, id: Uuid) -> Result<Option<Quote>, RepositoryError>;
    async fn save(&self, quote: &Quote) -> Result<u64, RepositoryError>;
    /// Persists the converted quote together with its order. At most one order exists per quote.
    async fn save_conversion(&self, quote: &Quote, order: &Order) -> Result<u64, RepositoryError>;
}
