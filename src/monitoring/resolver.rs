use async_trait::async_trait;
use std::io;
use std::net::IpAddr;
use tracing::debug;

use super::error::ResolutionError;

#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<IpAddr, ResolutionError>;
}

/// Resolves hostnames through the system resolver. Literal IP addresses are
/// returned as-is without a lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsResolver;

#[async_trait]
impl AddressResolver for DnsResolver {
    async fn resolve(&self, identifier: &str) -> Result<IpAddr, ResolutionError> {
        if let Ok(address) = identifier.parse::<IpAddr>() {
            return Ok(address);
        }

        debug!(identifier = %identifier, "Resolving IP address for device.");
        let mut addrs = tokio::net::lookup_host((identifier, 0))
            .await
            .map_err(|source| ResolutionError {
                identifier: identifier.to_string(),
                source,
            })?;

        match addrs.next() {
            Some(addr) => {
                debug!(identifier = %identifier, address = %addr.ip(), "Identifier resolved.");
                Ok(addr.ip())
            }
            None => Err(ResolutionError {
                identifier: identifier.to_string(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    "DNS resolution returned no addresses",
                ),
            }),
        }
    }
}
