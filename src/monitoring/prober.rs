use async_trait::async_trait;
use rand::random;
use std::net::IpAddr;
use std::time::Duration;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::error::{CheckError, ProbeError};
use crate::db::entities::monitor_device;
use crate::db::enums::Proto;

pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_ICMP_TIMEOUT: Duration = Duration::from_millis(2000);

/// What to probe on a resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTarget {
    Icmp,
    Tcp { port: u16 },
}

impl ProbeTarget {
    /// TCP devices without a usable port cannot be probed this cycle.
    pub fn for_device(device: &monitor_device::Model) -> Result<Self, CheckError> {
        match device.protocol {
            Proto::Icmp => Ok(ProbeTarget::Icmp),
            Proto::Tcp => device
                .port
                .and_then(|port| u16::try_from(port).ok())
                .filter(|port| *port != 0)
                .map(|port| ProbeTarget::Tcp { port })
                .ok_or(CheckError::Configuration {
                    device_id: device.id,
                }),
        }
    }
}

#[async_trait]
pub trait ReachabilityProber: Send + Sync {
    /// `Ok(false)` is a confirmed "unreachable"; `Err` means the probe could
    /// not produce an answer.
    async fn probe(&self, address: IpAddr, target: ProbeTarget) -> Result<bool, ProbeError>;
}

/// Probes over the network. Every call opens and closes its own socket.
#[derive(Debug, Clone)]
pub struct NetworkProber {
    icmp_timeout: Duration,
    tcp_timeout: Duration,
}

impl Default for NetworkProber {
    fn default() -> Self {
        Self::new(DEFAULT_ICMP_TIMEOUT)
    }
}

impl NetworkProber {
    pub fn new(icmp_timeout: Duration) -> Self {
        Self {
            icmp_timeout,
            tcp_timeout: TCP_CONNECT_TIMEOUT,
        }
    }

    async fn ping(&self, address: IpAddr) -> Result<bool, ProbeError> {
        let config = match address {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client =
            Client::new(&config).map_err(|source| ProbeError::IcmpSocket { address, source })?;

        let mut pinger = client.pinger(address, PingIdentifier(random())).await;
        pinger.timeout(self.icmp_timeout);

        match pinger.ping(PingSequence(0), &[]).await {
            Ok((_reply, rtt)) => {
                debug!(address = %address, rtt_ms = rtt.as_millis() as u64, "Ping reply received.");
                Ok(true)
            }
            Err(SurgeError::Timeout { .. }) => {
                debug!(address = %address, "Ping timed out.");
                Ok(false)
            }
            Err(source) => Err(ProbeError::Icmp { address, source }),
        }
    }

    async fn connect(&self, address: IpAddr, port: u16) -> Result<bool, ProbeError> {
        debug!(address = %address, port, "Testing TCP connectivity.");
        match timeout(self.tcp_timeout, TcpStream::connect((address, port))).await {
            Ok(Ok(stream)) => {
                drop(stream);
                debug!(address = %address, port, "TCP connectivity: ACTIVE");
                Ok(true)
            }
            Ok(Err(source)) => Err(ProbeError::Tcp {
                address,
                port,
                source,
            }),
            Err(_) => {
                debug!(address = %address, port, "TCP connectivity: INACTIVE");
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl ReachabilityProber for NetworkProber {
    async fn probe(&self, address: IpAddr, target: ProbeTarget) -> Result<bool, ProbeError> {
        match target {
            ProbeTarget::Icmp => self.ping(address).await,
            ProbeTarget::Tcp { port } => self.connect(address, port).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::MonitorTrigger;
    use chrono::Utc;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    fn device(protocol: Proto, port: Option<i32>) -> monitor_device::Model {
        monitor_device::Model {
            id: 3,
            name: "db".to_string(),
            identifier: "127.0.0.1".to_string(),
            port,
            protocol,
            persist: false,
            monitor_trigger: MonitorTrigger::Offline,
            monitor_start_utc: 0,
            monitor_end_utc: 2400,
            been_notified: false,
            requested_by: "ops".to_string(),
            notify: "ops@example.com".to_string(),
            email_subject: "down".to_string(),
            email_body: "down".to_string(),
            comments: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_probe_target_for_device() {
        assert_eq!(
            ProbeTarget::for_device(&device(Proto::Icmp, None)).unwrap(),
            ProbeTarget::Icmp
        );
        assert_eq!(
            ProbeTarget::for_device(&device(Proto::Tcp, Some(5432))).unwrap(),
            ProbeTarget::Tcp { port: 5432 }
        );
        assert!(matches!(
            ProbeTarget::for_device(&device(Proto::Tcp, None)),
            Err(CheckError::Configuration { device_id: 3 })
        ));
        assert!(matches!(
            ProbeTarget::for_device(&device(Proto::Tcp, Some(70000))),
            Err(CheckError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_tcp_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let reachable = NetworkProber::default()
            .probe(IpAddr::V4(Ipv4Addr::LOCALHOST), ProbeTarget::Tcp { port })
            .await
            .unwrap();
        assert!(reachable);
    }

    #[tokio::test]
    async fn test_tcp_refused_is_a_probe_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = NetworkProber::default()
            .probe(IpAddr::V4(Ipv4Addr::LOCALHOST), ProbeTarget::Tcp { port })
            .await;
        assert!(matches!(result, Err(ProbeError::Tcp { .. })));
    }
}
