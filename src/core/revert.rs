use crate::config::file::PatternConfig;
use crate::utils::error::Result;
use crate::utils::validation::validate_regex;
use regex::Regex;

/// Extracts the reverted contributor from an edit summary.
///
/// Rollback and undo summaries are generated by MediaWiki itself, so the
/// patterns are stable per wiki language; both are configurable.
pub struct RevertMatcher {
    rollback: Regex,
    undo: Regex,
}

impl RevertMatcher {
    pub fn new(rollback_pattern: &str, undo_pattern: &str) -> Result<Self> {
        Ok(Self {
            rollback: validate_regex("patterns.rollback_summary", rollback_pattern)?,
            undo: validate_regex("patterns.undo_summary", undo_pattern)?,
        })
    }

    pub fn from_config(patterns: &PatternConfig) -> Result<Self> {
        Self::new(&patterns.rollback_summary, &patterns.undo_summary)
    }

    /// The user whose edit the summary reverts. An undo match wins over a
    /// rollback match when a summary somehow contains both.
    pub fn reverted_user(&self, comment: &str) -> Option<String> {
        let mut user = None;
        if let Some(caps) = self.rollback.captures(comment) {
            user = caps.get(1).map(|m| m.as_str().to_string());
        }
        if let Some(caps) = self.undo.captures(comment) {
            user = caps.get(1).map(|m| m.as_str().to_string());
        }
        user
    }
}
