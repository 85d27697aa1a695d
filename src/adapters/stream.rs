use crate::config::file::StreamConfig;
use crate::config::SentinelConfig;
use crate::domain::model::{ChangeKind, RecentChange};
use crate::domain::ports::ChangeStream;
use crate::utils::error::{Result, SentinelError};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

type BodyStream = Pin<Box<dyn Stream<Item = std::result::Result<Vec<u8>, reqwest::Error>> + Send>>;

/// Incremental server-sent-events framing.
///
/// Fed raw byte chunks, yields complete events. `id:` is sticky, as the
/// SSE spec requires, so the latest one can resume a dropped connection.
struct SseBuffer {
    partial: Vec<u8>,
    data_lines: Vec<String>,
    id: Option<String>,
}

struct SseEvent {
    id: Option<String>,
    data: String,
}

impl SseBuffer {
    fn new() -> Self {
        Self {
            partial: Vec::new(),
            data_lines: Vec::new(),
            id: None,
        }
    }

    fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for byte in chunk {
            if *byte == b'\n' {
                let line = String::from_utf8_lossy(&self.partial).into_owned();
                self.partial.clear();
                if let Some(event) = self.take_line(line.trim_end_matches('\r')) {
                    events.push(event);
                }
            } else {
                self.partial.push(*byte);
            }
        }
        events
    }

    fn take_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if self.data_lines.is_empty() {
                return None;
            }
            let data = self.data_lines.join("\n");
            self.data_lines.clear();
            return Some(SseEvent {
                id: self.id.clone(),
                data,
            });
        }
        if line.starts_with(':') {
            return None; // comment / keep-alive
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data_lines.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {} // "event" and "retry" carry nothing we act on
        }
        None
    }
}

fn decode_event(event: &SseEvent) -> Option<RecentChange> {
    match serde_json::from_str::<RecentChange>(&event.data) {
        Ok(change) => {
            // the title of a log entry may have been suppressed
            if change.kind == ChangeKind::Log && change.title.is_none() {
                return None;
            }
            Some(change)
        }
        Err(e) => {
            tracing::warn!("Skipping undecodable stream event: {}", e);
            None
        }
    }
}

/// Recent-changes feed over SSE, with reconnect and resume.
pub struct SseChangeStream {
    client: Client,
    url: String,
    reconnect_attempts: u32,
    reconnect_delay: Duration,
    attempts_used: u32,
    connected_once: bool,
    body: Option<BodyStream>,
    buffer: SseBuffer,
    last_event_id: Option<String>,
    pending: VecDeque<RecentChange>,
}

impl SseChangeStream {
    pub fn new(client: Client, url: impl Into<String>, stream_cfg: &StreamConfig) -> Self {
        Self {
            client,
            url: url.into(),
            reconnect_attempts: stream_cfg.reconnect_attempts,
            reconnect_delay: Duration::from_secs(stream_cfg.reconnect_delay_seconds),
            attempts_used: 0,
            connected_once: false,
            body: None,
            buffer: SseBuffer::new(),
            last_event_id: None,
            pending: VecDeque::new(),
        }
    }

    pub fn from_config(client: Client, settings: &SentinelConfig) -> Self {
        Self::new(client, settings.site.stream_url.clone(), &settings.stream)
    }

    async fn connect(&mut self) -> Result<()> {
        let mut request = self
            .client
            .get(&self.url)
            .header("Accept", "text/event-stream");
        if let Some(id) = &self.last_event_id {
            request = request.header("Last-Event-ID", id.clone());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SentinelError::StreamError {
                message: format!("stream endpoint returned {}", response.status()),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()));
        self.body = Some(Box::pin(body));
        self.buffer = SseBuffer::new();
        Ok(())
    }

    /// False once the reconnect budget is spent. The very first connect
    /// failure is fatal instead: a bad endpoint should not be retried into.
    async fn ensure_connected(&mut self) -> Result<bool> {
        while self.body.is_none() {
            if self.connected_once {
                if self.attempts_used >= self.reconnect_attempts {
                    tracing::warn!(
                        "Stream reconnect budget exhausted after {} attempts",
                        self.attempts_used
                    );
                    return Ok(false);
                }
                self.attempts_used += 1;
                let delay = self.reconnect_delay * self.attempts_used;
                tracing::info!(
                    "Reconnecting to the stream in {:?} (attempt {}/{})",
                    delay,
                    self.attempts_used,
                    self.reconnect_attempts
                );
                tokio::time::sleep(delay).await;
            }

            match self.connect().await {
                Ok(()) => self.connected_once = true,
                Err(e) if self.connected_once => {
                    tracing::warn!("Stream reconnect failed: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl ChangeStream for SseChangeStream {
    async fn next_change(&mut self) -> Result<Option<RecentChange>> {
        loop {
            if let Some(change) = self.pending.pop_front() {
                // data is flowing again, forget earlier reconnects
                self.attempts_used = 0;
                return Ok(Some(change));
            }

            if self.body.is_none() && !self.ensure_connected().await? {
                return Ok(None);
            }
            let chunk = match self.body.as_mut() {
                Some(body) => body.next().await,
                None => continue,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for event in self.buffer.push(&bytes) {
                        if let Some(id) = &event.id {
                            self.last_event_id = Some(id.clone());
                        }
                        if let Some(change) = decode_event(&event) {
                            self.pending.push_back(change);
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!("Recent-changes stream read failed: {}", e);
                    self.body = None;
                }
                None => {
                    tracing::warn!("Recent-changes stream closed by server");
                    self.body = None;
                }
            }
        }
    }
}
