//! Adapters for the domain's persistence and messaging ports.
pub mod events;
pub mod memory;
pub mod postgres;

pub use events::{EventPublisher, LogPublisher, NatsPublisher};
pub use memory::{InMemoryBusinessProfileRepository, InMemoryQuoteRepository, InMemoryRuleSetRepository};
pub use postgres::{PgBusinessProfileRepository, PgQuoteRepository, PgRuleSetRepository};
