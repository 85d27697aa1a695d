pub mod file;

pub use file::SentinelConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "rc-sentinel")]
#[command(about = "Watches a wiki's recent-changes feed and flags proxy/VPN abuse")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long)]
    pub stream_url: Option<String>,

    /// Wiki identifier to filter the feed on, e.g. "dewiki"
    #[arg(long)]
    pub wiki: Option<String>,

    /// Title of the vandalism-report page to watch
    #[arg(long)]
    pub report_page: Option<String>,

    /// Where to append findings (JSON lines)
    #[arg(long)]
    pub findings_path: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process statistics while running")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// File (or default) settings with CLI flags layered on top.
    pub fn into_settings(&self) -> Result<SentinelConfig> {
        let mut settings = match &self.config {
            Some(path) => SentinelConfig::from_file(path)?,
            None => SentinelConfig::default(),
        };

        if let Some(api_url) = &self.api_url {
            settings.site.api_url = api_url.clone();
        }
        if let Some(stream_url) = &self.stream_url {
            settings.site.stream_url = stream_url.clone();
        }
        if let Some(wiki) = &self.wiki {
            settings.site.wiki = Some(wiki.clone());
        }
        if let Some(report_page) = &self.report_page {
            settings.site.report_page = report_page.clone();
        }
        if let Some(findings_path) = &self.findings_path {
            settings.output.findings_path = findings_path.clone();
        }
        if self.monitor {
            settings.monitoring.enabled = true;
        }

        Ok(settings)
    }
}
