//! The global pricing rule set edited from the admin settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AccountClassification;
use crate::domain::value_objects::Percentage;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSettings {
    pub enabled: bool,
    pub gst_rate_percentage: Percentage,
}

impl Default for TaxSettings {
    fn default() -> Self {
        Self { enabled: true, gst_rate_percentage: Percentage::whole(18) }
    }
}

/// Editable fields of the rule set. Stored together with a version stamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRules {
    pub guest_price_visible: bool,
    pub individual_price_visible: bool,
    pub business_unverified_price_visible: bool,
    pub business_verified_price_visible: bool,
    pub business_verified_can_buy: bool,
    pub bulk_pricing_enabled: bool,
    pub minimum_order_quantity: u32,
    pub discount_cap_percentage: Percentage,
    #[serde(default)]
    pub tax: TaxSettings,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            guest_price_visible: false,
            individual_price_visible: true,
            business_unverified_price_visible: false,
            business_verified_price_visible: true,
            business_verified_can_buy: true,
            bulk_pricing_enabled: false,
            minimum_order_quantity: 1,
            discount_cap_percentage: Percentage::whole(20),
            tax: TaxSettings::default(),
        }
    }
}

impl PricingRules {
    /// Prices hidden for everyone and no direct purchase.
    pub fn conservative() -> Self {
        Self {
            guest_price_visible: false,
            individual_price_visible: false,
            business_unverified_price_visible: false,
            business_verified_price_visible: false,
            business_verified_can_buy: false,
            bulk_pricing_enabled: false,
            minimum_order_quantity: 1,
            discount_cap_percentage: Percentage::zero(),
            tax: TaxSettings::default(),
        }
    }

    pub fn price_visible_for(&self, classification: AccountClassification) -> bool {
        match classification {
            AccountClassification::Guest => self.guest_price_visible,
            AccountClassification::Individual => self.individual_price_visible,
            AccountClassification::BusinessUnverified => self.business_unverified_price_visible,
            AccountClassification::BusinessVerified => self.business_verified_price_visible,
        }
    }

    pub fn validate(&self) -> Result<(), RuleSetError> {
        if self.minimum_order_quantity == 0 {
            return Err(RuleSetError::InvalidMinimumOrderQuantity);
        }
        Ok(())
    }
}

/// Version-stamped rule set row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRuleSet {
    pub version: u64,
    #[serde(flatten)]
    pub rules: PricingRules,
    pub updated_at: DateTime<Utc>,
}

impl PricingRuleSet {
    pub fn initial() -> Self {
        Self { version: 1, rules: PricingRules::default(), updated_at: Utc::now() }
    }

    pub fn conservative() -> Self {
        Self { version: 0, rules: PricingRules::conservative(), updated_at: Utc::now() }
    }

    /// Produces the next version of this rule set if `expected_version` matches.
    pub fn apply_update(&self, expected_version: u64, rules: PricingRules) -> Result<Self, RuleSetError> {
        if expected_version != self.version {
            return Err(RuleSetError::VersionConflict { expected: expected_version, actual: self.version });
        }
        rules.validate()?;
        Ok(Self { version: self.version + 1, rules, updated_at: Utc::now() })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleSetError {
    #[error("Minimum order quantity must be at least 1")]
    InvalidMinimumOrderQuantity,
    #[error("Pricing rules were changed by someone else (expected version {expected}, found {actual})")]
    VersionConflict { expected: u64, actual: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conservative_hides_everything() {
        let rules = PricingRules::conservative();
        for c in [
            AccountClassification::Guest,
            AccountClassification::Individual,
            AccountClassification::BusinessUnverified,
            AccountClassification::BusinessVerified,
        ] {
            assert!(!rules.price_visible_for(c));
        }
        assert!(!rules.business_verified_can_buy);
    }

    #[test]
    fn test_apply_update_bumps_version() {
        let current = PricingRuleSet::initial();
        let mut rules = current.rules.clone();
        rules.guest_price_visible = true;
        let next = current.apply_update(1, rules).unwrap();
        assert_eq!(next.version, 2);
        assert!(next.rules.guest_price_visible);
    }

    #[test]
    fn test_apply_update_rejects_stale_version() {
        let current = PricingRuleSet::initial();
        let err = current.apply_update(7, PricingRules::default()).unwrap_err();
        assert_eq!(err, RuleSetError::VersionConflict { expected: 7, actual: 1 });
    }

    #[test]
    fn test_zero_moq_rejected() {
        let rules = PricingRules { minimum_order_quantity: 0, ..PricingRules::default() };
        assert_eq!(PricingRuleSet::initial().apply_update(1, rules).unwrap_err(), RuleSetError::InvalidMinimumOrderQuantity);
    }

    #[test]
    fn test_deserialize_rejects_cap_over_100() {
        let mut json = serde_json::to_value(PricingRules::default()).unwrap();
        json["discount_cap_percentage"] = serde_json::json!("120");
        assert!(serde_json::from_value::<PricingRules>(json).is_err());
    }
}
