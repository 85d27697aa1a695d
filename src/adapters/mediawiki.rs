use crate::domain::model::BlockLogEntry;
use crate::domain::ports::WikiClient;
use crate::utils::error::{Result, SentinelError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Read-only client for the MediaWiki action API.
pub struct MediaWikiClient {
    client: Client,
    api_url: String,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    error: Option<ApiErrorBody>,
    #[serde(rename = "continue")]
    cont: Option<ContinueBody>,
    query: Option<T>,
}

#[derive(Deserialize)]
struct ContinueBody {
    lecontinue: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: String,
    info: String,
}

#[derive(Deserialize)]
struct RevisionQuery {
    #[serde(default)]
    pages: Vec<PageRevisions>,
}

#[derive(Deserialize)]
struct PageRevisions {
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Deserialize)]
struct Revision {
    slots: RevisionSlots,
}

#[derive(Deserialize)]
struct RevisionSlots {
    main: SlotContent,
}

#[derive(Deserialize)]
struct SlotContent {
    content: String,
}

#[derive(Deserialize)]
struct LogEventQuery {
    #[serde(default)]
    logevents: Vec<LogEventBody>,
}

#[derive(Deserialize)]
struct LogEventBody {
    action: String,
    title: String,
    timestamp: String,
    #[serde(default)]
    params: LogParams,
}

#[derive(Deserialize, Default)]
struct LogParams {
    expiry: Option<String>,
}

#[derive(Deserialize)]
struct BlockQuery {
    #[serde(default)]
    blocks: Vec<serde_json::Value>,
}

impl MediaWikiClient {
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    async fn get_query<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let (query, _) = self.get_query_page(params).await?;
        Ok(query)
    }

    /// One API request; also returns the continuation token when the
    /// result set has more pages.
    async fn get_query_page<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<(T, Option<String>)> {
        let mut query = vec![("action", "query"), ("format", "json"), ("formatversion", "2")];
        query.extend_from_slice(params);

        tracing::debug!("API request to {} with {:?}", self.api_url, params);
        let response = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        let body: ApiResponse<T> = response.json().await?;
        if let Some(error) = body.error {
            return Err(SentinelError::ApiError {
                code: error.code,
                info: error.info,
            });
        }
        let cont = body.cont.and_then(|c| c.lecontinue);
        let query = body.query.ok_or_else(|| SentinelError::ApiError {
            code: "emptyresponse".to_string(),
            info: "response carried neither query nor error".to_string(),
        })?;
        Ok((query, cont))
    }

    /// Runs a logevents query to completion, following continuation so
    /// long block logs are not truncated at the page size.
    async fn log_events(&self, params: &[(&str, &str)]) -> Result<Vec<BlockLogEntry>> {
        let mut entries = Vec::new();
        let mut cont: Option<String> = None;
        loop {
            let (query, next) = {
                let mut page_params = params.to_vec();
                if let Some(token) = cont.as_deref() {
                    page_params.push(("lecontinue", token));
                }
                self.get_query_page::<LogEventQuery>(&page_params).await?
            };
            for event in query.logevents {
                entries.push(into_entry(event)?);
            }
            if next.is_none() {
                return Ok(entries);
            }
            cont = next;
        }
    }
}

#[async_trait]
impl WikiClient for MediaWikiClient {
    async fn revision_wikitext(&self, revision_id: u64) -> Result<String> {
        let revids = revision_id.to_string();
        let query: RevisionQuery = self
            .get_query(&[
                ("prop", "revisions"),
                ("revids", &revids),
                ("rvprop", "content"),
                ("rvslots", "main"),
            ])
            .await?;

        query
            .pages
            .into_iter()
            .flat_map(|page| page.revisions)
            .next()
            .map(|revision| revision.slots.main.content)
            .ok_or_else(|| SentinelError::ApiError {
                code: "badrevids".to_string(),
                info: format!("revision {} not found", revision_id),
            })
    }

    async fn block_log_since(&self, since: DateTime<Utc>) -> Result<Vec<BlockLogEntry>> {
        let start = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.log_events(&[
            ("list", "logevents"),
            ("letype", "block"),
            ("lestart", &start),
            ("ledir", "newer"),
            ("lelimit", "500"),
        ])
        .await
    }

    async fn block_log_for_user(&self, user: &str) -> Result<Vec<BlockLogEntry>> {
        // the canonical "User:" prefix is accepted on every wiki language
        let title = format!("User:{}", user);
        self.log_events(&[
            ("list", "logevents"),
            ("letype", "block"),
            ("letitle", &title),
            ("lelimit", "500"),
        ])
        .await
    }

    async fn is_blocked(&self, user: &str) -> Result<bool> {
        let query: BlockQuery = self
            .get_query(&[("list", "blocks"), ("bkusers", user), ("bklimit", "1")])
            .await?;
        Ok(!query.blocks.is_empty())
    }
}

fn into_entry(event: LogEventBody) -> Result<BlockLogEntry> {
    Ok(BlockLogEntry {
        user: strip_namespace(&event.title).to_string(),
        timestamp: parse_api_timestamp(&event.timestamp)?,
        expiry: parse_expiry(event.params.expiry.as_deref())?,
        action: event.action,
    })
}

/// Log titles come localized ("Benutzer:1.2.3.4"); only the page name
/// after the namespace matters here.
fn strip_namespace(title: &str) -> &str {
    title
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(title)
}

fn parse_api_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| SentinelError::TimestampError(value.to_string()))
}

fn parse_expiry(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some("infinity") | Some("infinite") | Some("indefinite") | Some("never") => Ok(None),
        Some(other) => parse_api_timestamp(other).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn wiki(server: &MockServer) -> MediaWikiClient {
        MediaWikiClient::new(Client::new(), server.url("/w/api.php"))
    }

    #[test]
    fn test_strip_namespace() {
        assert_eq!(strip_namespace("Benutzer:203.0.113.5"), "203.0.113.5");
        assert_eq!(strip_namespace("User:203.0.113.5"), "203.0.113.5");
        assert_eq!(strip_namespace("203.0.113.5"), "203.0.113.5");
    }

    #[test]
    fn test_parse_expiry_special_values() {
        assert_eq!(parse_expiry(None).unwrap(), None);
        assert_eq!(parse_expiry(Some("infinity")).unwrap(), None);
        assert_eq!(parse_expiry(Some("indefinite")).unwrap(), None);
        assert!(parse_expiry(Some("2026-01-01T00:00:00Z")).unwrap().is_some());
        assert!(parse_expiry(Some("tomorrow-ish")).is_err());
    }

    #[tokio::test]
    async fn test_revision_wikitext() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/w/api.php")
                .query_param("prop", "revisions")
                .query_param("revids", "12345");
            then.status(200).json_body(serde_json::json!({
                "query": {
                    "pages": [{
                        "pageid": 1,
                        "revisions": [{
                            "slots": {"main": {"content": "{{Benutzer|203.0.113.5}}"}}
                        }]
                    }]
                }
            }));
        });

        let text = wiki(&server).revision_wikitext(12345).await.unwrap();

        api_mock.assert();
        assert_eq!(text, "{{Benutzer|203.0.113.5}}");
    }

    #[tokio::test]
    async fn test_missing_revision_is_an_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/w/api.php");
            then.status(200)
                .json_body(serde_json::json!({"query": {"badrevids": {"99": {"revid": 99}}}}));
        });

        let result = wiki(&server).revision_wikitext(99).await;
        assert!(matches!(result, Err(SentinelError::ApiError { .. })));
    }

    #[tokio::test]
    async fn test_api_error_payload_is_surfaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/w/api.php");
            then.status(200).json_body(serde_json::json!({
                "error": {"code": "maxlag", "info": "Waiting for replication"}
            }));
        });

        match wiki(&server).revision_wikitext(1).await {
            Err(SentinelError::ApiError { code, .. }) => assert_eq!(code, "maxlag"),
            other => panic!("expected ApiError, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_block_log_since_parses_entries() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/w/api.php")
                .query_param("list", "logevents")
                .query_param("ledir", "newer");
            then.status(200).json_body(serde_json::json!({
                "query": {
                    "logevents": [
                        {
                            "action": "block",
                            "title": "Benutzer:203.0.113.5",
                            "timestamp": "2026-08-29T10:00:00Z",
                            "params": {"expiry": "2026-08-31T10:00:00Z"}
                        },
                        {
                            "action": "block",
                            "title": "Benutzer:Vandale123",
                            "timestamp": "2026-08-29T10:05:00Z",
                            "params": {"expiry": "infinity"}
                        }
                    ]
                }
            }));
        });

        let since = Utc::now();
        let entries = wiki(&server).block_log_since(since).await.unwrap();

        api_mock.assert();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user, "203.0.113.5");
        assert!(entries[0].expiry.is_some());
        assert_eq!(entries[1].user, "Vandale123");
        assert_eq!(entries[1].expiry, None);
    }

    #[tokio::test]
    async fn test_block_log_follows_continuation() {
        let server = MockServer::start();
        // created first so the continued request (which also matches the
        // plain mock below) is answered here
        let second_page = server.mock(|when, then| {
            when.method(GET)
                .path("/w/api.php")
                .query_param("lecontinue", "20260829100000|42");
            then.status(200).json_body(serde_json::json!({
                "query": {
                    "logevents": [{
                        "action": "block",
                        "title": "Benutzer:198.51.100.7",
                        "timestamp": "2026-08-29T09:00:00Z",
                        "params": {}
                    }]
                }
            }));
        });
        let first_page = server.mock(|when, then| {
            when.method(GET)
                .path("/w/api.php")
                .query_param("list", "logevents")
                .query_param("letitle", "User:203.0.113.5");
            then.status(200).json_body(serde_json::json!({
                "continue": {"lecontinue": "20260829100000|42", "continue": "-||"},
                "query": {
                    "logevents": [{
                        "action": "block",
                        "title": "Benutzer:203.0.113.5",
                        "timestamp": "2026-08-29T10:00:00Z",
                        "params": {"expiry": "infinity"}
                    }]
                }
            }));
        });

        let entries = wiki(&server)
            .block_log_for_user("203.0.113.5")
            .await
            .unwrap();

        first_page.assert();
        second_page.assert();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user, "203.0.113.5");
        assert_eq!(entries[1].user, "198.51.100.7");
    }

    #[tokio::test]
    async fn test_is_blocked() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/w/api.php")
                .query_param("list", "blocks")
                .query_param("bkusers", "203.0.113.5");
            then.status(200).json_body(serde_json::json!({
                "query": {"blocks": [{"id": 1, "user": "203.0.113.5"}]}
            }));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/w/api.php")
                .query_param("list", "blocks")
                .query_param("bkusers", "198.51.100.7");
            then.status(200)
                .json_body(serde_json::json!({"query": {"blocks": []}}));
        });

        let client = wiki(&server);
        assert!(client.is_blocked("203.0.113.5").await.unwrap());
        assert!(!client.is_blocked("198.51.100.7").await.unwrap());
    }
}
