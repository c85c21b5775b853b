//! Keyword rules that turn phrases in a generated answer into advisories.

use serde::{Deserialize, Serialize};

/// Advisory added when the answer refers the user to a doctor.
pub const EMERGENCY_ADVISORY: &str = "URGENT: Please go to the nearest healthcare facility.";

/// Advisory added when the answer discusses nutrition.
pub const NUTRITION_ADVISORY: &str = "SUGGESTION: Review your nutrition plan.";

/// A trigger phrase and the advisory it adds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRule {
    pub trigger: String,
    pub advisory: String,
}

impl ActionRule {
    pub fn new(trigger: impl Into<String>, advisory: impl Into<String>) -> Self {
        Self { trigger: trigger.into(), advisory: advisory.into() }
    }
}

/// An ordered table of [`ActionRule`]s.
///
/// Matching is case-insensitive. Each rule contributes its advisory at most
/// once, in table order, and an advisory already emitted by an earlier rule
/// is not repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRules {
    rules: Vec<ActionRule>,
}

impl Default for ActionRules {
    fn default() -> Self {
        Self::new(vec![
            ActionRule::new("see a doctor", EMERGENCY_ADVISORY),
            ActionRule::new("nutrition", NUTRITION_ADVISORY),
        ])
    }
}

impl ActionRules {
    pub fn new(rules: Vec<ActionRule>) -> Self {
        Self { rules }
    }

    /// A table with no rules.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Append a rule after the existing ones.
    pub fn with_rule(mut self, trigger: impl Into<String>, advisory: impl Into<String>) -> Self {
        self.rules.push(ActionRule::new(trigger, advisory));
        self
    }

    pub fn rules(&self) -> &[ActionRule] {
        &self.rules
    }

    /// The advisories triggered by `text`.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        let mut actions: Vec<String> = Vec::new();
        for rule in &self.rules {
            if rule.trigger.is_empty() || !haystack.contains(&rule.trigger.to_lowercase()) {
                continue;
            }
            if !actions.contains(&rule.advisory) {
                actions.push(rule.advisory.clone());
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_trigger_yields_one_advisory() {
        let text = "See a doctor today. If it persists, SEE A DOCTOR again.";
        assert_eq!(ActionRules::default().extract(text), [EMERGENCY_ADVISORY]);
    }

    #[test]
    fn advisories_follow_rule_order() {
        let text = "Good nutrition matters. Please see a doctor if you bleed.";
        assert_eq!(ActionRules::default().extract(text), [EMERGENCY_ADVISORY, NUTRITION_ADVISORY]);
    }

    #[test]
    fn no_trigger_no_advisory() {
        assert!(ActionRules::default().extract("Rest and hydrate.").is_empty());
        assert!(ActionRules::empty().extract("see a doctor").is_empty());
    }

    #[test]
    fn custom_rules_share_advisories_without_duplicates() {
        let rules = ActionRules::default().with_rule("emergency", EMERGENCY_ADVISORY);
        let actions = rules.extract("This is an emergency, see a doctor.");
        assert_eq!(actions, [EMERGENCY_ADVISORY]);
    }
}
