//! Throttled low-disk alerts over UDP.
//!
//! Alerts are fire-and-forget: a failed send is absorbed and simply leaves the
//! throttle open so the next breach tick tries again.

#![allow(missing_docs)]

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::core::config::AlertConfig;
use crate::core::errors::{LgmError, Result};

// ──────────────────── transport ────────────────────

/// Datagram transport for alert payloads.
pub trait AlertTransport: Send + Sync {
    fn send(&self, payload: &[u8], host: &str, port: u16) -> Result<()>;
}

/// One unacknowledged UDP datagram per alert.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    write_timeout: Duration,
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(1),
        }
    }
}

impl UdpTransport {
    #[must_use]
    pub const fn new(write_timeout: Duration) -> Self {
        Self { write_timeout }
    }
}

impl AlertTransport for UdpTransport {
    fn send(&self, payload: &[u8], host: &str, port: u16) -> Result<()> {
        let target = format!("{host}:{port}");
        let transport_err = |details: String| LgmError::Transport {
            target: target.clone(),
            details,
        };

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| transport_err(format!("resolve failed: {e}")))?
            .next()
            .ok_or_else(|| transport_err("host resolved to no address".to_string()))?;

        let bind = match addr {
            SocketAddr::V4(_) => "0.0.0.0:0",
            SocketAddr::V6(_) => "[::]:0",
        };
        let socket =
            UdpSocket::bind(bind).map_err(|e| transport_err(format!("bind failed: {e}")))?;
        socket
            .set_write_timeout(Some(self.write_timeout))
            .map_err(|e| transport_err(format!("set timeout failed: {e}")))?;
        socket
            .send_to(payload, addr)
            .map_err(|e| transport_err(format!("send failed: {e}")))?;
        Ok(())
    }
}

/// Records payloads instead of sending them. Optionally fails every send.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String, u16)>>,
    attempts: Mutex<usize>,
    fail: Mutex<bool>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// Successfully "sent" `(payload, host, port)` triples.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String, u16)> {
        self.sent.lock().clone()
    }

    #[must_use]
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

impl AlertTransport for RecordingTransport {
    fn send(&self, payload: &[u8], host: &str, port: u16) -> Result<()> {
        *self.attempts.lock() += 1;
        if *self.fail.lock() {
            return Err(LgmError::Transport {
                target: format!("{host}:{port}"),
                details: "recording transport set to fail".to_string(),
            });
        }
        self.sent.lock().push((
            String::from_utf8_lossy(payload).into_owned(),
            host.to_string(),
            port,
        ));
        Ok(())
    }
}

// ──────────────────── template ────────────────────

/// Replace every `{path}`, `{avail_bytes}` and `{ratio}` (two decimals).
/// Unknown placeholders are left as they are.
#[must_use]
pub fn render_template(template: &str, root: &Path, available_bytes: u64, ratio_pct: f64) -> String {
    template
        .replace("{path}", &root.display().to_string())
        .replace("{avail_bytes}", &available_bytes.to_string())
        .replace("{ratio}", &format!("{ratio_pct:.2}"))
}

// ──────────────────── throttle ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AlertOutcome {
    Sent { payload: String },
    Throttled,
    NotConfigured,
    Failed { details: String },
}

impl fmt::Display for AlertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent { .. } => write!(f, "sent"),
            Self::Throttled => write!(f, "throttled"),
            Self::NotConfigured => write!(f, "not configured"),
            Self::Failed { details } => write!(f, "failed: {details}"),
        }
    }
}

/// Rate limiter in front of an [`AlertTransport`].
pub struct AlertThrottle {
    transport: Arc<dyn AlertTransport>,
    last_sent: Option<Instant>,
}

impl AlertThrottle {
    #[must_use]
    pub fn new(transport: Arc<dyn AlertTransport>) -> Self {
        Self {
            transport,
            last_sent: None,
        }
    }

    #[must_use]
    pub const fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    /// Send one alert unless unconfigured or still inside the interval.
    pub fn maybe_alert(
        &mut self,
        config: &AlertConfig,
        ratio_pct: f64,
        available_bytes: u64,
        root: &Path,
        now: Instant,
    ) -> AlertOutcome {
        if !config.is_configured() {
            return AlertOutcome::NotConfigured;
        }
        if let Some(last) = self.last_sent
            && now.saturating_duration_since(last) < Duration::from_secs(config.interval_secs)
        {
            return AlertOutcome::Throttled;
        }

        let payload = render_template(&config.template, root, available_bytes, ratio_pct);
        match self
            .transport
            .send(payload.as_bytes(), &config.host, config.port)
        {
            Ok(()) => {
                self.last_sent = Some(now);
                AlertOutcome::Sent { payload }
            }
            Err(e) => AlertOutcome::Failed {
                details: e.to_string(),
            },
        }
    }
}
