use crate::domain::model::CheckOutcome;
use crate::domain::ports::ProxyChecker;
use crate::utils::error::{Result, SentinelError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Both scorers map their provider's answer onto the same 0..=4 scale so
/// the controller can compare either against one threshold. Failures are
/// `CheckError` so callers can skip the IP instead of dying.
const QUICK_SOURCE: &str = "quick";
const DEEP_SOURCE: &str = "deep";

fn check_failure(provider: &str, message: impl ToString) -> SentinelError {
    SentinelError::CheckError {
        provider: provider.to_string(),
        message: message.to_string(),
    }
}

/// Cheap unauthenticated pre-filter.
pub struct QuickProxyCheck {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct QuickCheckBody {
    vpn_or_proxy: String,
    #[serde(default)]
    is_hosting: bool,
    #[serde(default)]
    risk: Option<String>,
}

impl QuickProxyCheck {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProxyChecker for QuickProxyCheck {
    async fn check(&self, ip: &str) -> Result<CheckOutcome> {
        let url = format!("{}/api/vpn/{}", self.base_url.trim_end_matches('/'), ip);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| check_failure(QUICK_SOURCE, e))?;

        if !response.status().is_success() {
            return Err(check_failure(
                QUICK_SOURCE,
                format!("status {}", response.status()),
            ));
        }

        let body: QuickCheckBody = response
            .json()
            .await
            .map_err(|e| check_failure(QUICK_SOURCE, e))?;

        let mut score = 0u8;
        if body.vpn_or_proxy == "yes" {
            score += 2;
        }
        if body.is_hosting {
            score += 1;
        }
        if body.risk.as_deref() == Some("high") {
            score += 1;
        }

        Ok(CheckOutcome {
            score,
            source: QUICK_SOURCE.to_string(),
        })
    }
}

/// Aggregating multi-source check, used for confirmation.
pub struct DeepProxyCheck {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct DeepCheckBody {
    score: u8,
    #[serde(default)]
    sources: Vec<String>,
}

impl DeepProxyCheck {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProxyChecker for DeepProxyCheck {
    async fn check(&self, ip: &str) -> Result<CheckOutcome> {
        let url = format!("{}/check/{}", self.base_url.trim_end_matches('/'), ip);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| check_failure(DEEP_SOURCE, e))?;

        if !response.status().is_success() {
            return Err(check_failure(
                DEEP_SOURCE,
                format!("status {}", response.status()),
            ));
        }

        let body: DeepCheckBody = response
            .json()
            .await
            .map_err(|e| check_failure(DEEP_SOURCE, e))?;

        tracing::debug!(
            "Deep check for {}: score {} from {:?}",
            ip,
            body.score,
            body.sources
        );

        Ok(CheckOutcome {
            score: body.score.min(4),
            source: DEEP_SOURCE.to_string(),
        })
    }
}
