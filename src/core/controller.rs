use crate::config::SentinelConfig;
use crate::core::blocklog::BlockLogScanner;
use crate::core::reports::{self, ReportExtractor};
use crate::core::revert::RevertMatcher;
use crate::domain::model::{is_anonymous, ChangeKind, Finding, RecentChange};
use crate::domain::ports::{ChangeStream, DnsblLookup, FindingSink, ProxyChecker, WikiClient};
use crate::utils::error::{Result, SentinelError};
use crate::utils::monitor::SystemMonitor;
use chrono::Utc;
use std::time::Duration;

/// Event loop tying the feed, the wiki API, the proxy scorers, the DNSBL
/// and the findings sink together.
///
/// Proxy-check failures are logged and skipped (an unreachable scorer must
/// not take the sentinel down); wiki API and sink failures end the run.
pub struct Sentinel<S, W, Q, P, N, F> {
    stream: S,
    wiki: W,
    quick: Q,
    deep: P,
    dnsbl: N,
    sink: F,
    matcher: RevertMatcher,
    extractor: ReportExtractor,
    scanner: BlockLogScanner,
    monitor: SystemMonitor,
    settings: SentinelConfig,
}

impl<S, W, Q, P, N, F> Sentinel<S, W, Q, P, N, F>
where
    S: ChangeStream,
    W: WikiClient,
    Q: ProxyChecker,
    P: ProxyChecker,
    N: DnsblLookup,
    F: FindingSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: SentinelConfig,
        stream: S,
        wiki: W,
        quick: Q,
        deep: P,
        dnsbl: N,
        sink: F,
        monitor: SystemMonitor,
    ) -> Result<Self> {
        let matcher = RevertMatcher::from_config(&settings.patterns)?;
        let extractor = ReportExtractor::new(&settings.patterns.user_template)?;
        let scanner = BlockLogScanner::new(Utc::now(), &settings.timing);

        Ok(Self {
            stream,
            wiki,
            quick,
            deep,
            dnsbl,
            sink,
            matcher,
            extractor,
            scanner,
            monitor,
            settings,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let watchdog = Duration::from_secs(self.settings.timing.watchdog_seconds);
        tracing::info!(
            "👁️ Watching recent changes on {} (watchdog {}s)",
            self.settings.site.stream_url,
            watchdog.as_secs()
        );

        loop {
            let change = match tokio::time::timeout(watchdog, self.stream.next_change()).await {
                Err(_) => {
                    return Err(SentinelError::StreamStalled {
                        seconds: watchdog.as_secs(),
                    })
                }
                Ok(Err(e)) => return Err(e),
                Ok(Ok(None)) => {
                    tracing::warn!("Recent-changes feed ended - this should not happen");
                    self.monitor.log_final_stats();
                    return Ok(());
                }
                Ok(Ok(Some(change))) => change,
            };

            if self.treat(change).await? {
                self.maybe_scan_block_log().await?;
            }
        }
    }

    /// Returns false when the event was dropped by one of the early
    /// filters; such events must cause no API traffic, so the caller
    /// skips the block-log scan too.
    async fn treat(&mut self, change: RecentChange) -> Result<bool> {
        if let Some(wanted) = &self.settings.site.wiki {
            if change.wiki.as_deref() != Some(wanted.as_str()) {
                return Ok(false);
            }
        }
        if change.namespace < 0 {
            return Ok(false);
        }

        let now = Utc::now();
        let age = change.age(now);
        if age > chrono::Duration::seconds(self.settings.timing.max_event_age_seconds as i64) {
            tracing::warn!("Change too old: {}s behind", age.num_seconds());
            return Ok(false);
        }

        if change.kind != ChangeKind::Edit {
            return Ok(true);
        }

        if change.namespace == 4
            && change.title.as_deref() == Some(self.settings.site.report_page.as_str())
            && !change.bot
        {
            if let Some(revision) = change.revision {
                if let (Some(old_id), Some(new_id)) = (revision.old, revision.new) {
                    self.treat_report_page_change(old_id, new_id).await?;
                }
            }
        }

        if let Some(user) = self.matcher.reverted_user(&change.comment) {
            if is_anonymous(&user) {
                self.check_reverted_ip(&user).await?;
            }
        }

        Ok(true)
    }

    /// Quick pre-filter first; only a positive quick score is worth the
    /// heavier deep lookup.
    async fn check_reverted_ip(&self, ip: &str) -> Result<()> {
        let quick = match self.quick.check(ip).await {
            Ok(outcome) => outcome,
            Err(SentinelError::CheckError { provider, message }) => {
                tracing::warn!("{} could not be checked via {}: {}", ip, provider, message);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if quick.score < self.threshold() {
            tracing::debug!("Reverted IP {} looks clean (quick score {})", ip, quick.score);
            return Ok(());
        }

        let deep = match self.deep.check(ip).await {
            Ok(outcome) => outcome,
            Err(SentinelError::CheckError { provider, message }) => {
                tracing::warn!("{} could not be checked via {}: {}", ip, provider, message);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if deep.score >= self.threshold() {
            self.record(Finding::RevertedProxy {
                ip: ip.to_string(),
                score: deep.score,
                source: deep.source,
            })
            .await?;
        }

        Ok(())
    }

    async fn treat_report_page_change(&self, old_id: u64, new_id: u64) -> Result<()> {
        let old_text = self.wiki.revision_wikitext(old_id).await?;
        let new_text = self.wiki.revision_wikitext(new_id).await?;

        for user in self.extractor.newly_reported(&old_text, &new_text) {
            if is_anonymous(&user) {
                self.assess_reported_ip(&user).await?;
            }
        }

        Ok(())
    }

    async fn assess_reported_ip(&self, ip: &str) -> Result<()> {
        let outcome = match self.deep.check(ip).await {
            Ok(outcome) => outcome,
            Err(SentinelError::CheckError { provider, message }) => {
                tracing::warn!("{} could not be checked via {}: {}", ip, provider, message);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let vpn_or_proxy = outcome.score >= self.threshold();

        let static_ip = !self.dnsbl.is_dynamic(ip).await?;

        let currently_blocked = self.wiki.is_blocked(ip).await?;
        let log = self.wiki.block_log_for_user(ip).await?;
        let mut prior_blocks = reports::block_count(&log);
        if currently_blocked {
            // the active block is already in the log; show only history
            prior_blocks = prior_blocks.saturating_sub(1);
        }

        self.record(Finding::ReportedIp {
            ip: ip.to_string(),
            static_ip,
            vpn_or_proxy,
            prior_blocks,
        })
        .await
    }

    async fn maybe_scan_block_log(&mut self) -> Result<()> {
        let now = Utc::now();
        let since = match self.scanner.begin_scan(now) {
            Some(since) => since,
            None => return Ok(()),
        };

        self.monitor.log_stats("Block scan");

        let entries = self.wiki.block_log_since(since).await?;
        for ip in self.scanner.short_blocked_ips(now, &entries) {
            match self.deep.check(&ip).await {
                Ok(outcome) if outcome.score >= self.threshold() => {
                    self.record(Finding::BlockedProxy {
                        ip: ip.clone(),
                        score: outcome.score,
                    })
                    .await?;
                }
                Ok(_) => {}
                Err(SentinelError::CheckError { provider, message }) => {
                    tracing::warn!("{} could not be checked via {}: {}", ip, provider, message);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    fn threshold(&self) -> u8 {
        self.settings.checks.score_threshold
    }

    async fn record(&self, finding: Finding) -> Result<()> {
        match &finding {
            Finding::RevertedProxy { ip, score, source } => {
                tracing::info!(
                    "🚨 IP found after revert: {} is a PROXY (score {} via {})",
                    ip,
                    score,
                    source
                );
            }
            Finding::BlockedProxy { ip, score } => {
                tracing::info!("🚨 Blocked IP {} is a PROXY (score {})", ip, score);
            }
            Finding::ReportedIp {
                ip,
                static_ip,
                vpn_or_proxy,
                prior_blocks,
            } => {
                tracing::info!(
                    "📋 Reported IP: {} Static: {} VPN: {} Previous blocks: {}",
                    ip,
                    static_ip,
                    vpn_or_proxy,
                    prior_blocks
                );
            }
        }
        self.sink.record(&finding).await
    }
}
