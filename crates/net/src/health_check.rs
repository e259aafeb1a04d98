// Copyright (c) 2024 rustgram-client contributors
//
// Licensed under MIT OR Apache-2.0

//! Connection health checking utilities.
//!
//! This module provides utilities for checking the health of TCP connections
//! before reusing them from the connection pool.

use std::time::Duration;

use crate::connection::ConnectionError;
use crate::session::SessionConnection;

/// Health check configuration.
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Timeout for health check operations.
    /// Default: 1 second
    pub timeout: Duration,

    /// Whether to perform deep checks (actual probe) vs shallow checks.
    /// Default: false (shallow check only)
    pub deep_check: bool,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            deep_check: false,
        }
    }
}

/// Result of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Connection is healthy
    Healthy,

    /// Connection is unhealthy
    Unhealthy,

    /// Health check timed out
    Timeout,

    /// Health check failed with error
    Error,
}

/// Health checker for connections.
#[derive(Debug)]
pub struct HealthChecker {
    config: HealthCheckConfig,
}

impl HealthChecker {
    /// Creates a new health checker.
    pub fn new(config: HealthCheckConfig) -> Self {
        Self { config }
    }

    /// Creates a health checker with default configuration.
    pub fn default() -> Self {
        Self::new(HealthCheckConfig::default())
    }

    /// Performs a health check on a session connection.
    ///
    /// This checks:
    /// 1. Connection state is Ready
    /// 2. Auth key is available
    /// 3. Optional: TCP socket is still connected
    pub async fn check_connection(
        &self,
        conn: &SessionConnection,
    ) -> Result<HealthStatus, ConnectionError> {
        use tokio::time::timeout;

        // Shallow check: verify connection state and auth key
        if !conn.is_ready() {
            tracing::debug!(
                "Health check failed for DC {:?}: connection not ready",
                conn.dc_id()
            );
            return Ok(HealthStatus::Unhealthy);
        }

        // Deep check: verify the query channel still has a live receiver.
        if self.config.deep_check {
            let check_result = timeout(self.config.timeout, async {
                if conn.query_sender().is_closed() {
                    tracing::debug!(
                        "Health check failed for DC {:?}: query channel closed",
                        conn.dc_id()
                    );
                    Err(ConnectionError::Failed("query channel closed".into()))
                } else {
                    Ok(HealthStatus::Healthy)
                }
            })
            .await;

            match check_result {
                Ok(Ok(status)) => Ok(status),
                Ok(Err(e)) => Err(e),
                Err(_) => {
                    tracing::debug!(
                        "Health check timed out for DC {:?}",
                        conn.dc_id()
                    );
                    Ok(HealthStatus::Timeout)
                }
            }
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    /// Performs a quick health check (non-blocking, shallow only).
    ///
    /// This only checks connection state without async operations.
    pub fn check_connection_quick(conn: &SessionConnection) -> HealthStatus {
        if conn.is_ready() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}
