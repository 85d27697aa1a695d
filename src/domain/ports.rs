use crate::domain::model::{BlockLogEntry, CheckOutcome, Finding, RecentChange};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait ChangeStream: Send {
    /// Next change from the feed, or None once the feed has ended.
    async fn next_change(&mut self) -> Result<Option<RecentChange>>;
}

#[async_trait]
pub trait WikiClient: Send + Sync {
    async fn revision_wikitext(&self, revision_id: u64) -> Result<String>;
    async fn block_log_since(&self, since: DateTime<Utc>) -> Result<Vec<BlockLogEntry>>;
    async fn block_log_for_user(&self, user: &str) -> Result<Vec<BlockLogEntry>>;
    async fn is_blocked(&self, user: &str) -> Result<bool>;
}

#[async_trait]
pub trait ProxyChecker: Send + Sync {
    async fn check(&self, ip: &str) -> Result<CheckOutcome>;
}

#[async_trait]
pub trait DnsblLookup: Send + Sync {
    async fn is_dynamic(&self, ip: &str) -> Result<bool>;
}

#[async_trait]
pub trait FindingSink: Send + Sync {
    async fn record(&self, finding: &Finding) -> Result<()>;
}
