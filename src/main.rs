use clap::Parser;
use rc_sentinel::adapters::{
    DeepProxyCheck, JsonlSink, MediaWikiClient, QuickProxyCheck, SorbsDnsbl, SseChangeStream,
};
use rc_sentinel::utils::{logger, monitor::SystemMonitor, validation::Validate};
use rc_sentinel::{CliConfig, Sentinel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting rc-sentinel");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let settings = match cli.into_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Failed to load configuration: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let monitor_enabled = settings.monitoring.enabled;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let client = reqwest::Client::new();
    let stream = SseChangeStream::from_config(client.clone(), &settings);
    let wiki = MediaWikiClient::new(client.clone(), settings.site.api_url.clone());
    let quick = QuickProxyCheck::new(client.clone(), settings.checks.quick_url.clone());
    let deep = DeepProxyCheck::new(client, settings.checks.deep_url.clone());
    let dnsbl = SorbsDnsbl::new(settings.checks.dnsbl_zone.clone());
    let sink = JsonlSink::new(settings.output.findings_path.clone());
    let monitor = SystemMonitor::new(monitor_enabled);

    let mut sentinel = Sentinel::new(settings, stream, wiki, quick, deep, dnsbl, sink, monitor)?;

    match sentinel.run().await {
        Ok(()) => {
            tracing::warn!("Sentinel loop ended");
        }
        Err(e) => {
            tracing::error!("❌ Sentinel stopped: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
