use std::collections::HashSet;
use std::net::Ipv4Addr;

use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::error::{OrchestratorError, Result};

pub const DEFAULT_START_PORT: u16 = 3100;
pub const DEFAULT_END_PORT: u16 = 5000;
pub const DEFAULT_PORTS_NEEDED: u16 = 10;

/// Ports commonly claimed by other tools; never handed out.
pub const DEFAULT_SKIP_PORTS: [u16; 10] = [
    3000, // common dev default
    3001, // common API default
    4000, // Remix
    5000, // Flask and friends
    5173, // Vite
    5432, // PostgreSQL
    6379, // Redis
    8000, // Django and friends
    8080, // HTTP alt
    8888, // Jupyter
];

#[derive(Debug, Clone)]
pub struct PortScanOptions {
    pub start_port: u16,
    pub end_port: u16,
    pub ports_needed: u16,
    pub skip_ports: HashSet<u16>,
}

impl Default for PortScanOptions {
    fn default() -> Self {
        Self {
            start_port: DEFAULT_START_PORT,
            end_port: DEFAULT_END_PORT,
            ports_needed: DEFAULT_PORTS_NEEDED,
            skip_ports: DEFAULT_SKIP_PORTS.into_iter().collect(),
        }
    }
}

/// Find the lowest base port such that `[base, base + ports_needed)` is free
/// on loopback and clear of the skip list.
///
/// Candidates are tried in ascending order; the ports of one candidate are
/// probed concurrently. A port found free here can still be taken by another
/// process before the dev task binds it. Nothing in this process can close
/// that gap, and the task's own bind error will show up in its output.
pub async fn find_available_port_range(options: &PortScanOptions) -> Result<u16> {
    let needed = u32::from(options.ports_needed);
    // Binding port 0 yields an ephemeral port, so it never counts as free.
    let start = u32::from(options.start_port.max(1));
    let end = u32::from(options.end_port);

    if needed > 0 && end >= needed {
        for base in start..=end - needed {
            if let Some(skipped) = (base..base + needed)
                .find(|p| options.skip_ports.contains(&(*p as u16)))
            {
                tracing::trace!(base, skipped, "candidate overlaps skip list");
                continue;
            }

            // `base + needed <= end <= u16::MAX`, so both casts are lossless.
            if is_range_available(base as u16, needed as u16).await {
                tracing::debug!(base, needed, "found free port range");
                return Ok(base as u16);
            }
            tracing::debug!(base, needed, "port range partially in use");
        }
    }

    Err(OrchestratorError::PortRangeUnavailable {
        ports_needed: options.ports_needed,
        start_port: options.start_port,
        end_port: options.end_port,
    })
}

/// Probe every port in the range at once; all must be bindable.
async fn is_range_available(base: u16, count: u16) -> bool {
    let mut probes = JoinSet::new();
    for port in base..base + count {
        probes.spawn(is_port_available(port));
    }

    let mut available = true;
    while let Some(probe) = probes.join_next().await {
        if !matches!(probe, Ok(true)) {
            available = false;
        }
    }
    available
}

async fn is_port_available(port: u16) -> bool {
    match TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) => {
            tracing::trace!(port, "port unavailable: {e}");
            false
        }
    }
}
