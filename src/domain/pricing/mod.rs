//! Price visibility and purchase-path rules.
pub mod classification;
pub mod resolver;
pub mod rules;
pub mod view;

pub use classification::{
    classify, AccountClassification, BusinessProfile, ClassificationProvider, ProfileClassificationProvider,
    VerificationStatus,
};
pub use resolver::{AllowedAction, PricingDecision, PricingVisibilityResolver};
pub use rules::{PricingRuleSet, PricingRules, RuleSetError, TaxSettings};
pub use view::{ProductPricingView, StockStatus};
