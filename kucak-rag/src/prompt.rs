//! Prompt composition for the two consultation domains.
//!
//! Both system templates carry the same safety directives: answers grounded
//! in scientific evidence, a calm tone that avoids causing anxiety, mandatory
//! referral to professional care when emergency signs are present, and
//! tailoring to the gestation week or infant age.

use serde::{Deserialize, Serialize};

use crate::domain::{Domain, DomainFilters};
use crate::llm::ChatMessage;

/// Rendered in place of a week or age the caller did not supply.
pub const UNSPECIFIED: &str = "unspecified";

/// Directive sentence present in every system instruction.
pub const ESCALATION_DIRECTIVE: &str =
    "If the question or context mentions any emergency or danger sign, \
     clearly tell the user to seek professional medical care immediately \
     and to see a doctor or go to the nearest healthcare facility.";

const SHARED_DIRECTIVES: &str = "\
- Base every answer on scientific evidence and the provided context; say so when the context does not cover the question.
- Use a calm, supportive tone and avoid causing unnecessary anxiety.
- Tailor the guidance to the stated week or age whenever it is known.";

const ANSWER_LAYOUT: &str = "\
Structure your answer as:
1. A short, clear summary
2. A detailed explanation
3. Recommendations specific to the stated week or age (if any)
4. Emergency warnings (when needed)";

/// The system instruction and user message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessages {
    pub system_instruction: String,
    pub user_message: String,
}

impl PromptMessages {
    /// The `[system, user]` message pair.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system_instruction), ChatMessage::user(self.user_message)]
    }
}

/// Builds deterministic prompts from a question, its grounding context, and
/// the domain parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        Self
    }

    /// Compose the message pair for one question.
    ///
    /// The user message always puts the context first and the question last.
    pub fn compose(
        &self,
        question: &str,
        context: &str,
        domain: Domain,
        filters: &DomainFilters,
    ) -> PromptMessages {
        PromptMessages {
            system_instruction: self.system_instruction(domain, filters),
            user_message: format!("Context:\n{context}\n\nQuestion: {question}"),
        }
    }

    /// The system instruction for `domain`, embedding the relevant filter value.
    pub fn system_instruction(&self, domain: Domain, filters: &DomainFilters) -> String {
        let value =
            filters.value_for(domain).map_or_else(|| UNSPECIFIED.to_string(), |v| v.to_string());

        match domain {
            Domain::Pregnancy => format!(
                "You are Kucak-AI's pregnancy specialist. The mother is in pregnancy week: {value}.\n\
                 Your answers must:\n\
                 {SHARED_DIRECTIVES}\n\
                 - {ESCALATION_DIRECTIVE}\n\
                 - Explain the mother's physical and emotional changes for this week.\n\
                 - Describe the baby's development for this specific week.\n\
                 - Give nutrition and exercise recommendations.\n\n\
                 {ANSWER_LAYOUT}"
            ),
            Domain::InfantCare => format!(
                "You are Kucak-AI's newborn care specialist. The baby's age in weeks: {value}.\n\
                 Your answers must:\n\
                 {SHARED_DIRECTIVES}\n\
                 - {ESCALATION_DIRECTIVE}\n\
                 - Give parents practical, age-appropriate care advice.\n\
                 - Reference WHO infant care guidelines where relevant.\n\n\
                 {ANSWER_LAYOUT}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn escalation_directive_is_always_present() {
        let composer = PromptComposer::new();
        for domain in [Domain::Pregnancy, Domain::InfantCare] {
            for filters in [
                DomainFilters::default(),
                DomainFilters::pregnancy_week(12),
                DomainFilters::baby_age_weeks(8),
            ] {
                let prompt = composer.compose("q", "c", domain, &filters);
                assert!(prompt.system_instruction.contains(ESCALATION_DIRECTIVE));
            }
        }
    }

    #[test]
    fn embeds_week_or_falls_back_to_unspecified() {
        let composer = PromptComposer::new();
        let week_20 = DomainFilters::pregnancy_week(20);
        let with_week = composer.system_instruction(Domain::Pregnancy, &week_20);
        assert!(with_week.contains("pregnancy week: 20"));

        let without = composer.system_instruction(Domain::InfantCare, &week_20);
        assert!(without.contains(&format!("age in weeks: {UNSPECIFIED}")));
    }

    #[test]
    fn user_message_puts_context_before_question() {
        let prompt = PromptComposer::new().compose(
            "Can I drink coffee?",
            "Source: WHO\nLimit caffeine.",
            Domain::Pregnancy,
            &DomainFilters::default(),
        );
        assert_eq!(
            prompt.user_message,
            "Context:\nSource: WHO\nLimit caffeine.\n\nQuestion: Can I drink coffee?"
        );

        let messages = prompt.into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }
}
