use crate::domain::ports::DnsblLookup;
use crate::utils::error::{Result, SentinelError};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};

/// Dynamic-IP test against a DUL-style DNS blocklist.
///
/// A listed address resolves, an unlisted one is NXDOMAIN. IPv6 addresses
/// are practically never dynamically assigned, so they skip the query.
pub struct SorbsDnsbl {
    zone: String,
}

impl SorbsDnsbl {
    pub fn new(zone: impl Into<String>) -> Self {
        Self { zone: zone.into() }
    }
}

fn query_host(addr: Ipv4Addr, zone: &str) -> String {
    let octets = addr.octets();
    format!(
        "{}.{}.{}.{}.{}",
        octets[3], octets[2], octets[1], octets[0], zone
    )
}

#[async_trait]
impl DnsblLookup for SorbsDnsbl {
    async fn is_dynamic(&self, ip: &str) -> Result<bool> {
        let addr: IpAddr = ip.parse().map_err(|_| SentinelError::CheckError {
            provider: "dnsbl".to_string(),
            message: format!("not an IP address: {}", ip),
        })?;

        let v4 = match addr {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(_) => return Ok(false),
        };

        let host = query_host(v4, &self.zone);
        // NXDOMAIN means not listed; the resolver offers no portable way
        // to tell it apart from an outage
        let listed = tokio::net::lookup_host((host.as_str(), 0))
            .await
            .map(|mut addrs| addrs.next().is_some())
            .unwrap_or(false);
        Ok(listed)
    }
}
