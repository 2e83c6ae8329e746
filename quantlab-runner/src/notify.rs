//! Alert delivery.
//!
//! Notifiers are fire-and-forget: the monitor collects delivery failures
//! into its summary instead of letting a broken channel stop the scan.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a detected signal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    Buy,
    Sell,
    Exit,
}

impl SignalKind {
    pub fn label(self) -> &'static str {
        match self {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
            SignalKind::Exit => "EXIT",
        }
    }
}

/// One actionable event produced by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalAlert {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub kind: SignalKind,
    pub price: f64,
    pub strategy: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Delivery channel for alerts.
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, alert: &SignalAlert) -> anyhow::Result<()>;
}

/// Writes alerts to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    fn send(&self, alert: &SignalAlert) -> anyhow::Result<()> {
        println!(
            "[{}] {} {} @ {:.2} ({}) {}",
            alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
            alert.kind.label(),
            alert.symbol,
            alert.price,
            alert.strategy,
            alert.reason,
        );
        Ok(())
    }
}
