//! Consultation domains, index namespaces, and per-request domain filters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::{BABY_AGE_WEEKS_KEY, Filter, PREGNANCY_WEEK_KEY};

/// A logical partition of the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Maternal health content.
    pub const MOTHER_HEALTH: &'static str = "mother_health";
    /// Infant development and care content.
    pub const BABY_DEVELOPMENT: &'static str = "baby_development";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn mother_health() -> Self {
        Self::new(Self::MOTHER_HEALTH)
    }

    pub fn baby_development() -> Self {
        Self::new(Self::BABY_DEVELOPMENT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The consultation area a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Pregnancy,
    InfantCare,
}

impl Domain {
    /// The namespace holding this domain's passages by default.
    pub fn default_namespace(self) -> Namespace {
        match self {
            Self::Pregnancy => Namespace::mother_health(),
            Self::InfantCare => Namespace::baby_development(),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pregnancy => f.write_str("pregnancy"),
            Self::InfantCare => f.write_str("infant_care"),
        }
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pregnancy" | "mother_health" => Ok(Self::Pregnancy),
            "infant_care" | "infant-care" | "baby_development" => Ok(Self::InfantCare),
            other => Err(format!("unknown domain '{other}' (expected pregnancy or infant_care)")),
        }
    }
}

/// Caller-supplied numeric context for a question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainFilters {
    /// Gestation week, for pregnancy questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pregnancy_week: Option<u32>,
    /// Infant age in weeks, for infant-care questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby_age_weeks: Option<u32>,
}

impl DomainFilters {
    pub fn pregnancy_week(week: u32) -> Self {
        Self { pregnancy_week: Some(week), baby_age_weeks: None }
    }

    pub fn baby_age_weeks(weeks: u32) -> Self {
        Self { pregnancy_week: None, baby_age_weeks: Some(weeks) }
    }

    /// The numeric value relevant to `domain`, if supplied.
    pub fn value_for(&self, domain: Domain) -> Option<u32> {
        match domain {
            Domain::Pregnancy => self.pregnancy_week,
            Domain::InfantCare => self.baby_age_weeks,
        }
    }

    /// The index filter for `domain`. Values belonging to the other domain are ignored.
    pub fn to_filter(&self, domain: Domain) -> Option<Filter> {
        let key = match domain {
            Domain::Pregnancy => PREGNANCY_WEEK_KEY,
            Domain::InfantCare => BABY_AGE_WEEKS_KEY,
        };
        self.value_for(domain).map(|value| Filter::eq(key, value))
    }
}
