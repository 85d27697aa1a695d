use crate::config::file::TimingConfig;
use crate::domain::model::{is_anonymous, BlockLogEntry};
use chrono::{DateTime, Duration, Utc};

/// Tracks the sliding window for the periodic block-log scan.
///
/// The scan is driven by event arrival rather than a timer, matching the
/// feed-paced cadence of the rest of the loop: each scan covers exactly
/// the span since the previous one.
pub struct BlockLogScanner {
    cursor: DateTime<Utc>,
    interval: Duration,
    expiry_window: Duration,
}

impl BlockLogScanner {
    pub fn new(now: DateTime<Utc>, timing: &TimingConfig) -> Self {
        Self {
            cursor: now,
            interval: Duration::seconds(timing.block_scan_interval_seconds as i64),
            expiry_window: Duration::days(timing.block_expiry_window_days as i64),
        }
    }

    /// Starts a scan if one is due, returning the start of the window and
    /// advancing the cursor to `now`.
    pub fn begin_scan(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if now - self.cursor < self.interval {
            return None;
        }
        let since = self.cursor;
        self.cursor = now;
        Some(since)
    }

    /// IPs that just received a short block (expiry inside the window).
    /// Indefinite blocks never qualify.
    pub fn short_blocked_ips(&self, now: DateTime<Utc>, entries: &[BlockLogEntry]) -> Vec<String> {
        entries
            .iter()
            .filter(|e| e.action == "block")
            .filter(|e| is_anonymous(&e.user))
            .filter(|e| matches!(e.expiry, Some(expiry) if expiry < now + self.expiry_window))
            .map(|e| e.user.clone())
            .collect()
    }
}
