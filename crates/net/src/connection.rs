// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Connection management for Telegram network layer.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dc::DcId;

/// Connection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionMode {
    /// TCP mode
    Tcp,
    /// HTTP mode
    Http,
}

impl Default for ConnectionMode {
    fn default() -> Self {
        Self::Tcp
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Connection is empty/not initialized
    Empty,
    /// Currently connecting
    Connecting,
    /// Connection is ready
    Ready,
    /// Connection is closed
    Closed,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Empty
    }
}

/// Connection error.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum ConnectionError {
    /// Invalid DC ID
    #[error("Invalid DC ID: {0:?}")]
    InvalidDcId(DcId),

    /// No DC options available
    #[error("No DC options available for DC {0:?}")]
    NoDcOptions(DcId),

    /// Connection failed
    #[error("Connection failed: {0}")]
    Failed(String),

    /// Timeout
    #[error("Connection timeout after {0:?}")]
    Timeout(Duration),

    /// Proxy error
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// SSL/TLS error
    #[error("SSL/TLS error: {0}")]
    Ssl(String),

    /// Socket error
    #[error("Socket error: {0}")]
    Socket(String),
}

/// Connection statistics.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Bytes sent
    pub bytes_sent: u64,

    /// Bytes received
    pub bytes_received: u64,

    /// Number of connections
    pub connection_count: u64,

    /// Number of failures
    pub failure_count: u64,

    /// Average round-trip time
    pub avg_rtt: Duration,

    /// Last successful connection time
    pub last_success: Option<Instant>,
}

impl ConnectionStats {
    /// Records a successful connection.
    pub fn record_success(&mut self, bytes_sent: u64, bytes_received: u64, rtt: Duration) {
        self.bytes_sent += bytes_sent;
        self.bytes_received += bytes_received;
        self.connection_count += 1;

        // Update average RTT
        if self.connection_count > 1 {
            let total_rtt = self.avg_rtt * (self.connection_count - 1) as u32;
            self.avg_rtt = (total_rtt + rtt) / self.connection_count as u32;
        } else {
            self.avg_rtt = rtt;
        }

        self.last_success = Some(Instant::now());
    }

    /// Records a failed connection.
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    /// Returns the success rate (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        let total = self.connection_count + self.failure_count;
        if total == 0 {
            0.0
        } else {
            self.connection_count as f64 / total as f64
        }
    }
}
