use crate::domain::model::BlockLogEntry;
use crate::utils::error::Result;
use crate::utils::validation::validate_regex;
use regex::Regex;
use std::collections::HashSet;

/// Finds user-report template instances on the vandalism page.
pub struct ReportExtractor {
    template: Regex,
}

impl ReportExtractor {
    pub fn new(template_pattern: &str) -> Result<Self> {
        Ok(Self {
            template: validate_regex("patterns.user_template", template_pattern)?,
        })
    }

    pub fn reported_users(&self, wikitext: &str) -> HashSet<String> {
        self.template
            .captures_iter(wikitext)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .collect()
    }

    /// Users reported in `new` but not in `old`.
    pub fn newly_reported(&self, old: &str, new: &str) -> Vec<String> {
        let old_users = self.reported_users(old);
        let new_users = self.reported_users(new);
        new_users.difference(&old_users).cloned().collect()
    }
}

/// Completed blocks in a user's log. Reblocks and unblocks don't count.
pub fn block_count(entries: &[BlockLogEntry]) -> u64 {
    entries.iter().filter(|e| e.action == "block").count() as u64
}
