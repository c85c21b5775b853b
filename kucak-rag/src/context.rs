//! Grounding-context assembly from ranked matches.

use tracing::warn;

use crate::error::{RagError, Result};
use crate::record::{BABY_AGE_WEEKS_KEY, Match, PREGNANCY_WEEK_KEY};

/// Context used when retrieval found nothing.
pub const NO_CONTEXT: &str = "No reference passages were found for this question.";

/// Attribution used for passages stored without a `source`.
pub const UNKNOWN_SOURCE: &str = "Unknown source";

/// Format ranked matches into a single grounding text.
///
/// Each match becomes one block:
///
/// ```text
/// Source: <source>
/// <passage text>
/// Pregnancy week: <n>
/// ```
///
/// The last line is present only when the metadata carries `pregnancy_week`;
/// otherwise a `Baby age: <n> weeks` line is added when it carries
/// `baby_age_weeks`. Blocks keep the input order and are separated by a blank
/// line. An empty slice yields [`NO_CONTEXT`].
///
/// # Errors
///
/// Returns [`RagError::DataIntegrity`] if a match has no string `text`.
pub fn build_context(matches: &[Match]) -> Result<String> {
    if matches.is_empty() {
        return Ok(NO_CONTEXT.to_string());
    }

    let mut blocks = Vec::with_capacity(matches.len());
    for m in matches {
        let text = m.metadata.text().ok_or_else(|| {
            warn!(match_id = %m.id, "retrieved match has no text");
            RagError::DataIntegrity {
                id: m.id.clone(),
                message: "metadata is missing required 'text'".to_string(),
            }
        })?;
        let source = m.metadata.source().unwrap_or(UNKNOWN_SOURCE);

        let mut block = format!("Source: {source}\n{text}");
        if let Some(week) = m.metadata.get(PREGNANCY_WEEK_KEY) {
            block.push_str(&format!("\nPregnancy week: {week}"));
        } else if let Some(age) = m.metadata.get(BABY_AGE_WEEKS_KEY) {
            block.push_str(&format!("\nBaby age: {age} weeks"));
        }
        blocks.push(block);
    }

    Ok(blocks.join("\n\n"))
}

/// The attribution of each match, in order, for [`Answer`](crate::Answer) references.
pub fn references(matches: &[Match]) -> Vec<String> {
    matches.iter().map(|m| m.metadata.source().unwrap_or(UNKNOWN_SOURCE).to_string()).collect()
}
