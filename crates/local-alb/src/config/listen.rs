//! Listener and metrics endpoint configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    pub port: u16,
    /// Interface to bind (default: all interfaces)
    #[serde(default = "default_listen_host")]
    pub host: String,
    /// Deadline for the whole action pipeline of one request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ListenConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("listen.host '{}' is not an IP address", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}
