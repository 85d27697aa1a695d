use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry from the recent-changes feed.
///
/// Only the fields the sentinel acts on are kept; the feed carries many
/// more, which serde ignores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub title: Option<String>,
    #[serde(default)]
    pub namespace: i64,
    pub user: String,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub comment: String,
    /// Epoch seconds, as emitted by the feed.
    pub timestamp: i64,
    pub revision: Option<RevisionIds>,
    pub wiki: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Edit,
    New,
    Log,
    Categorize,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RevisionIds {
    pub old: Option<u64>,
    pub new: Option<u64>,
}

impl RecentChange {
    pub fn timestamp_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.timestamp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp_utc()
    }
}

/// An entry from the wiki's block log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockLogEntry {
    pub action: String,
    /// Target user name, namespace prefix stripped.
    pub user: String,
    pub timestamp: DateTime<Utc>,
    /// None for indefinite blocks.
    pub expiry: Option<DateTime<Utc>>,
}

/// Result of scoring an IP against a proxy-check service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// 0 (clean) through 4 (certain proxy/VPN).
    pub score: u8,
    pub source: String,
}

/// Something worth flagging, as written to the findings sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// An IP whose edit was rolled back or undone scored as a proxy.
    RevertedProxy { ip: String, score: u8, source: String },
    /// A freshly short-blocked IP scored as a proxy.
    BlockedProxy { ip: String, score: u8 },
    /// Assessment of an IP newly reported on the vandalism page.
    ReportedIp {
        ip: String,
        static_ip: bool,
        vpn_or_proxy: bool,
        prior_blocks: u64,
    },
}

/// MediaWiki has no separate account flag for IP edits; an anonymous
/// contributor is simply one whose name is an IP address.
pub fn is_anonymous(user: &str) -> bool {
    user.parse::<std::net::IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_anonymous() {
        assert!(is_anonymous("203.0.113.5"));
        assert!(is_anonymous("2001:db8::1"));
        assert!(!is_anonymous("SomeUser"));
        assert!(!is_anonymous("203.0.113"));
    }

    #[test]
    fn test_recent_change_decodes_feed_event() {
        let raw = r#"{
            "type": "edit",
            "title": "Example",
            "namespace": 0,
            "user": "203.0.113.5",
            "bot": false,
            "comment": "test edit",
            "timestamp": 1767225600,
            "revision": {"old": 100, "new": 101},
            "wiki": "dewiki",
            "server_name": "de.wikipedia.org",
            "id": 12345
        }"#;

        let change: RecentChange = serde_json::from_str(raw).unwrap();
        assert_eq!(change.kind, ChangeKind::Edit);
        assert_eq!(change.title.as_deref(), Some("Example"));
        assert_eq!(change.revision.unwrap().new, Some(101));
        assert_eq!(change.wiki.as_deref(), Some("dewiki"));
    }

    #[test]
    fn test_unknown_change_kind_maps_to_other() {
        let raw = r#"{"type": "142", "user": "X", "timestamp": 0}"#;
        let change: RecentChange = serde_json::from_str(raw).unwrap();
        assert_eq!(change.kind, ChangeKind::Other);
        assert!(change.title.is_none());
    }

    #[test]
    fn test_finding_serializes_tagged() {
        let finding = Finding::RevertedProxy {
            ip: "203.0.113.5".to_string(),
            score: 3,
            source: "deep".to_string(),
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], "reverted_proxy");
        assert_eq!(json["score"], 3);
    }
}
