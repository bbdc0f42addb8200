//! Application services wiring the domain to its repositories.
pub mod pricing;
pub mod quotes;

pub use pricing::{PricingService, RuleSetCache};
pub use quotes::{Caller, QuoteService};
