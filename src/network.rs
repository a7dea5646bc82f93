//! Network reachability checks.
//!
//! Reachability is checked once per trigger (screen creation, search,
//! scroll), never monitored continuously.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Always reports the same answer (`--offline`, tests)
#[derive(Debug, Clone, Copy)]
pub struct FixedConnectivity(pub bool);

#[async_trait]
impl Connectivity for FixedConnectivity {
    async fn is_online(&self) -> bool {
        self.0
    }
}

/// Online if a TCP connection to the catalog host succeeds in time
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn is_online(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let online = matches!(tokio::time::timeout(self.timeout, connect).await, Ok(Ok(_)));
        tracing::debug!("Probe {}:{} -> {}", self.host, self.port, if online { "online" } else { "offline" });
        online
    }
}
