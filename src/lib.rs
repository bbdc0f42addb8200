//! Cedar Commerce pricing service
//!
//! Pricing visibility and quote handling for the Cedar Elevators B2B marketplace.
//!
//! ## Features
//! - Account classification (guest, individual, unverified and verified business)
//! - Price visibility and purchase-path decisions from a global rule set
//! - Version-stamped pricing rule administration
//! - Quote submission, capped admin pricing with GST, acceptance and conversion to orders
//! - Cart admission for customers allowed to check out

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod services;

use thiserror::Error;
use uuid::Uuid;

use domain::aggregates::{CartError, QuoteError};
use domain::pricing::RuleSetError;
use domain::repository::RepositoryError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("Quote not found: {0}")]
    QuoteNotFound(Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    RuleSet(#[from] RuleSetError),

    #[error("Storage error: {0}")]
    Storage(RepositoryError),
}

impl From<RepositoryError> for CommerceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::RuleSet(e) => Self::RuleSet(e),
            RepositoryError::Conflict(what) => Self::Conflict(format!("{what} was modified concurrently, reload and retry")),
            other => Self::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
