//! Maps a caller's classification and the rule set to a pricing decision.

use serde::{Deserialize, Serialize};

use super::{AccountClassification, PricingRules};

/// Purchase path offered to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowedAction {
    Login,
    Quote,
    Cart,
}

/// Outcome consumed by product listings, cart and quote flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingDecision {
    pub classification: AccountClassification,
    pub show_price: bool,
    pub can_checkout: bool,
    pub allowed_action: AllowedAction,
    pub bulk_pricing: bool,
    pub minimum_order_quantity: u32,
    /// Hint shown next to hidden prices or disabled checkout.
    pub reason: Option<String>,
}

pub struct PricingVisibilityResolver;

impl PricingVisibilityResolver {
    /// Resolves a decision. A missing rule set resolves against
    /// [`PricingRules::conservative`].
    pub fn resolve(classification: AccountClassification, rules: Option<&PricingRules>) -> PricingDecision {
        match rules {
            Some(rules) => Self::resolve_with(classification, rules),
            None => Self::fail_safe(classification),
        }
    }

    pub fn fail_safe(classification: AccountClassification) -> PricingDecision {
        Self::resolve_with(classification, &PricingRules::conservative())
    }

    fn resolve_with(classification: AccountClassification, rules: &PricingRules) -> PricingDecision {
        let show_price = rules.price_visible_for(classification);
        let (can_checkout, allowed_action) = match classification {
            AccountClassification::Guest => (false, AllowedAction::Login),
            AccountClassification::Individual | AccountClassification::BusinessUnverified => (false, AllowedAction::Quote),
            AccountClassification::BusinessVerified if rules.business_verified_can_buy => (true, AllowedAction::Cart),
            AccountClassification::BusinessVerified => (false, AllowedAction::Quote),
        };
        PricingDecision {
            classification,
            show_price,
            can_checkout,
            allowed_action,
            bulk_pricing: show_price && rules.bulk_pricing_enabled,
            minimum_order_quantity: rules.minimum_order_quantity.max(1),
            reason: reason(classification, show_price, can_checkout).map(str::to_string),
        }
    }
}

fn reason(classification: AccountClassification, show_price: bool, can_checkout: bool) -> Option<&'static str> {
    match classification {
        AccountClassification::Guest => Some("Sign in to view prices and request quotes"),
        AccountClassification::BusinessUnverified => Some("Business verification pending"),
        _ if !show_price => Some("Request a quote for pricing"),
        AccountClassification::BusinessVerified if !can_checkout => Some("Direct purchase is currently disabled"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AccountClassification; 4] = [
        AccountClassification::Guest,
        AccountClassification::Individual,
        AccountClassification::BusinessUnverified,
        AccountClassification::BusinessVerified,
    ];

    fn only_visible_for(c: AccountClassification, visible: bool) -> PricingRules {
        let mut rules = PricingRules::conservative();
        rules.business_verified_can_buy = true;
        match c {
            AccountClassification::Guest => rules.guest_price_visible = visible,
            AccountClassification::Individual => rules.individual_price_visible = visible,
            AccountClassification::BusinessUnverified => rules.business_unverified_price_visible = visible,
            AccountClassification::BusinessVerified => rules.business_verified_price_visible = visible,
        }
        rules
    }

    #[test]
    fn test_visibility_follows_flag_for_every_classification() {
        for c in ALL {
            for visible in [true, false] {
                let decision = PricingVisibilityResolver::resolve(c, Some(&only_visible_for(c, visible)));
                assert_eq!(decision.show_price, visible, "{c} visible={visible}");
            }
        }
    }

    #[test]
    fn test_guest_routes_to_login() {
        let mut rules = PricingRules::default();
        rules.guest_price_visible = true;
        let d = PricingVisibilityResolver::resolve(AccountClassification::Guest, Some(&rules));
        assert!(!d.can_checkout);
        assert_eq!(d.allowed_action, AllowedAction::Login);
    }

    #[test]
    fn test_individual_and_unverified_quote_only() {
        let mut rules = PricingRules::default();
        rules.business_unverified_price_visible = true;
        for c in [AccountClassification::Individual, AccountClassification::BusinessUnverified] {
            let d = PricingVisibilityResolver::resolve(c, Some(&rules));
            assert!(!d.can_checkout);
            assert_eq!(d.allowed_action, AllowedAction::Quote);
        }
    }

    #[test]
    fn test_verified_cart_follows_can_buy() {
        let mut rules = PricingRules::default();
        let d = PricingVisibilityResolver::resolve(AccountClassification::BusinessVerified, Some(&rules));
        assert!(d.can_checkout);
        assert_eq!(d.allowed_action, AllowedAction::Cart);

        rules.business_verified_can_buy = false;
        rules.guest_price_visible = true;
        rules.bulk_pricing_enabled = true;
        let d = PricingVisibilityResolver::resolve(AccountClassification::BusinessVerified, Some(&rules));
        assert!(!d.can_checkout);
        assert_eq!(d.allowed_action, AllowedAction::Quote);
    }

    #[test]
    fn test_cart_never_offered_without_can_buy() {
        let mut rules = PricingRules::default();
        rules.business_verified_can_buy = false;
        for c in ALL {
            assert_ne!(PricingVisibilityResolver::resolve(c, Some(&rules)).allowed_action, AllowedAction::Cart);
        }
    }

    #[test]
    fn test_missing_rules_fail_safe() {
        for c in ALL {
            let d = PricingVisibilityResolver::resolve(c, None);
            assert!(!d.show_price);
            assert!(!d.can_checkout);
            let expected = if c == AccountClassification::Guest { AllowedAction::Login } else { AllowedAction::Quote };
            assert_eq!(d.allowed_action, expected);
        }
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let rules = PricingRules::default();
        for c in ALL {
            let first = PricingVisibilityResolver::resolve(c, Some(&rules));
            let second = PricingVisibilityResolver::resolve(c, Some(&rules));
            assert_eq!(first, second);
        }
        assert_eq!(rules, PricingRules::default());
    }

    #[test]
    fn test_bulk_pricing_requires_visible_price() {
        let mut rules = PricingRules::default();
        rules.bulk_pricing_enabled = true;
        assert!(PricingVisibilityResolver::resolve(AccountClassification::BusinessVerified, Some(&rules)).bulk_pricing);
        assert!(!PricingVisibilityResolver::resolve(AccountClassification::Guest, Some(&rules)).bulk_pricing);
    }
}
