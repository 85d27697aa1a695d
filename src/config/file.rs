use crate::utils::error::{Result, SentinelError};
use crate::utils::validation::{
    self, validate_non_empty_string, validate_positive_number, validate_range, validate_url,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full runtime configuration. Every field has a sensible default so a
/// partial (or absent) TOML file still yields a runnable setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default)]
    pub checks: CheckConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
    /// Feed events from other wikis are dropped when set.
    #[serde(default = "default_wiki")]
    pub wiki: Option<String>,
    #[serde(default = "default_report_page")]
    pub report_page: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    #[serde(default = "default_rollback_summary")]
    pub rollback_summary: String,
    #[serde(default = "default_undo_summary")]
    pub undo_summary: String,
    #[serde(default = "default_user_template")]
    pub user_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_quick_url")]
    pub quick_url: String,
    #[serde(default = "default_deep_url")]
    pub deep_url: String,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: u8,
    #[serde(default = "default_dnsbl_zone")]
    pub dnsbl_zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_watchdog_seconds")]
    pub watchdog_seconds: u64,
    #[serde(default = "default_max_event_age_seconds")]
    pub max_event_age_seconds: u64,
    #[serde(default = "default_block_scan_interval_seconds")]
    pub block_scan_interval_seconds: u64,
    #[serde(default = "default_block_expiry_window_days")]
    pub block_expiry_window_days: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    #[serde(default = "default_reconnect_delay_seconds")]
    pub reconnect_delay_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_findings_path")]
    pub findings_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub enabled: bool,
}

fn default_api_url() -> String {
    "https://de.wikipedia.org/w/api.php".to_string()
}

fn default_stream_url() -> String {
    "https://stream.wikimedia.org/v2/stream/recentchange".to_string()
}

fn default_wiki() -> Option<String> {
    Some("dewiki".to_string())
}

fn default_report_page() -> String {
    "Wikipedia:Vandalismusmeldung".to_string()
}

fn default_rollback_summary() -> String {
    r"Änderungen von \[\[(?:Special:Contributions|Spezial:Beiträge)/([^|]+)\|.+".to_string()
}

fn default_undo_summary() -> String {
    r"Änderung [0-9]+ von \[\[Special:Contribs/([^|]+)\|.+".to_string()
}

fn default_user_template() -> String {
    r"\{\{Benutzer\|([^}]+)\}\}".to_string()
}

fn default_quick_url() -> String {
    "https://ip.teoh.io".to_string()
}

fn default_deep_url() -> String {
    "https://ipcheck.toolforge.org".to_string()
}

fn default_score_threshold() -> u8 {
    2
}

fn default_dnsbl_zone() -> String {
    "dul.dnsbl.sorbs.net".to_string()
}

fn default_watchdog_seconds() -> u64 {
    600
}

fn default_max_event_age_seconds() -> u64 {
    300
}

fn default_block_scan_interval_seconds() -> u64 {
    30
}

fn default_block_expiry_window_days() -> u64 {
    7
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_seconds() -> u64 {
    5
}

fn default_findings_path() -> String {
    "./findings.jsonl".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            stream_url: default_stream_url(),
            wiki: default_wiki(),
            report_page: default_report_page(),
        }
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            rollback_summary: default_rollback_summary(),
            undo_summary: default_undo_summary(),
            user_template: default_user_template(),
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            quick_url: default_quick_url(),
            deep_url: default_deep_url(),
            score_threshold: default_score_threshold(),
            dnsbl_zone: default_dnsbl_zone(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            watchdog_seconds: default_watchdog_seconds(),
            max_event_age_seconds: default_max_event_age_seconds(),
            block_scan_interval_seconds: default_block_scan_interval_seconds(),
            block_expiry_window_days: default_block_expiry_window_days(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_seconds: default_reconnect_delay_seconds(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            findings_path: default_findings_path(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            patterns: PatternConfig::default(),
            checks: CheckConfig::default(),
            timing: TimingConfig::default(),
            stream: StreamConfig::default(),
            output: OutputConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl SentinelConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SentinelError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SentinelError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Expands `${VAR_NAME}` references from the environment; unknown
    /// variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("site.api_url", &self.site.api_url)?;
        validate_url("site.stream_url", &self.site.stream_url)?;
        validate_url("checks.quick_url", &self.checks.quick_url)?;
        validate_url("checks.deep_url", &self.checks.deep_url)?;

        validate_non_empty_string("site.report_page", &self.site.report_page)?;
        validate_non_empty_string("checks.dnsbl_zone", &self.checks.dnsbl_zone)?;
        validate_non_empty_string("output.findings_path", &self.output.findings_path)?;

        validate_range("checks.score_threshold", self.checks.score_threshold, 0, 4)?;

        validate_positive_number("timing.watchdog_seconds", self.timing.watchdog_seconds, 1)?;
        validate_positive_number(
            "timing.max_event_age_seconds",
            self.timing.max_event_age_seconds,
            1,
        )?;
        validate_positive_number(
            "timing.block_scan_interval_seconds",
            self.timing.block_scan_interval_seconds,
            1,
        )?;
        validate_positive_number(
            "timing.block_expiry_window_days",
            self.timing.block_expiry_window_days,
            1,
        )?;

        validation::validate_regex("patterns.rollback_summary", &self.patterns.rollback_summary)?;
        validation::validate_regex("patterns.undo_summary", &self.patterns.undo_summary)?;
        validation::validate_regex("patterns.user_template", &self.patterns.user_template)?;

        Ok(())
    }
}

impl Validate for SentinelConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = SentinelConfig::from_toml_str("").unwrap();

        assert_eq!(config.site.wiki.as_deref(), Some("dewiki"));
        assert_eq!(config.site.report_page, "Wikipedia:Vandalismusmeldung");
        assert_eq!(config.checks.score_threshold, 2);
        assert_eq!(config.timing.watchdog_seconds, 600);
        assert_eq!(config.timing.block_scan_interval_seconds, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[site]
api_url = "https://test.wikipedia.org/w/api.php"
report_page = "Wikipedia:Administrator intervention"

[checks]
score_threshold = 3

[timing]
watchdog_seconds = 120
"#;

        let config = SentinelConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.site.api_url, "https://test.wikipedia.org/w/api.php");
        assert_eq!(config.site.report_page, "Wikipedia:Administrator intervention");
        assert_eq!(config.checks.score_threshold, 3);
        assert_eq!(config.timing.watchdog_seconds, 120);
        // untouched sections keep defaults
        assert_eq!(config.timing.max_event_age_seconds, 300);
        assert_eq!(config.stream.reconnect_attempts, 5);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_SENTINEL_API", "https://test.api.example");

        let toml_content = r#"
[site]
api_url = "${TEST_SENTINEL_API}"
"#;

        let config = SentinelConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.site.api_url, "https://test.api.example");

        std::env::remove_var("TEST_SENTINEL_API");
    }

    #[test]
    fn test_config_validation_rejects_bad_url() {
        let toml_content = r#"
[site]
api_url = "not-a-url"
"#;

        let config = SentinelConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_bad_threshold() {
        let toml_content = r#"
[checks]
score_threshold = 9
"#;

        let config = SentinelConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_bad_regex() {
        let toml_content = r#"
[patterns]
user_template = "(unclosed"
"#;

        let config = SentinelConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[site]
wiki = "enwiki"
report_page = "Wikipedia:AIV"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = SentinelConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.site.wiki.as_deref(), Some("enwiki"));
        assert_eq!(config.site.report_page, "Wikipedia:AIV");
    }
}
