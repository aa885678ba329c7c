//! The structured task passed from extraction to submission

use serde::{Deserialize, Serialize};

/// A task extracted from one sentence of free text
///
/// Created per submission by the extractor, consumed by the submitter,
/// never stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StructuredTask {
    /// Task title. Expected non-empty, not enforced.
    pub title: String,

    /// ISO-8601 calendar date, or `None` when no date was expressed.
    /// Passed to the submitter verbatim.
    #[serde(default)]
    pub date: Option<String>,
}

impl StructuredTask {
    pub fn new(title: impl Into<String>, date: Option<String>) -> Self {
        Self {
            title: title.into(),
            date,
        }
    }

    /// Whether `date` parses as a plain `YYYY-MM-DD` date or an RFC 3339 timestamp
    pub fn has_valid_date(&self) -> bool {
        self.date.as_deref().is_some_and(|d| {
            chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").is_ok()
                || chrono::DateTime::parse_from_rfc3339(d).is_ok()
        })
    }
}

impl std::fmt::Display for StructuredTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.date {
            Some(date) => write!(f, "{:?} (due {})", self.title, date),
            None => write!(f, "{:?}", self.title),
        }
    }
}
