//! Open-position tracking for the monitor.
//!
//! The store answers one question per tick ("are we already in this
//! symbol?") and persists across process restarts so a restarted monitor
//! does not re-alert on positions it already holds.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPosition {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
}

/// Position persistence used by the monitor to suppress duplicate alerts.
pub trait PositionStore: Send + Sync {
    fn has_position(&self, symbol: &str) -> bool;

    fn get_position(&self, symbol: &str) -> Option<StoredPosition>;

    /// Records a fill. Adding to an existing entry averages the entry
    /// price by quantity and keeps the original entry time.
    fn add_position(&mut self, symbol: &str, quantity: f64, price: f64) -> anyhow::Result<()>;

    fn remove_position(&mut self, symbol: &str) -> anyhow::Result<Option<StoredPosition>>;

    fn list_positions(&self) -> Vec<StoredPosition>;
}

/// JSON-file-backed store. The whole map is rewritten on every mutation;
/// position counts are small enough that this never matters.
#[derive(Debug)]
pub struct JsonPositionStore {
    path: PathBuf,
    positions: BTreeMap<String, StoredPosition>,
}

impl JsonPositionStore {
    /// Opens the store, loading any existing file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let positions = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading position store {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing position store {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, positions })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let text = serde_json::to_string_pretty(&self.positions)?;
        fs::write(&self.path, text)
            .with_context(|| format!("writing position store {}", self.path.display()))
    }
}

impl PositionStore for JsonPositionStore {
    fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    fn get_position(&self, symbol: &str) -> Option<StoredPosition> {
        self.positions.get(symbol).cloned()
    }

    fn add_position(&mut self, symbol: &str, quantity: f64, price: f64) -> anyhow::Result<()> {
        match self.positions.get_mut(symbol) {
            Some(existing) => {
                let total = existing.quantity + quantity;
                if total != 0.0 {
                    existing.entry_price = (existing.entry_price * existing.quantity
                        + price * quantity)
                        / total;
                }
                existing.quantity = total;
            }
            None => {
                self.positions.insert(
                    symbol.to_string(),
                    StoredPosition {
                        symbol: symbol.to_string(),
                        quantity,
                        entry_price: price,
                        entry_time: Utc::now(),
                    },
                );
            }
        }
        self.persist()
    }

    fn remove_position(&mut self, symbol: &str) -> anyhow::Result<Option<StoredPosition>> {
        let removed = self.positions.remove(symbol);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    fn list_positions(&self) -> Vec<StoredPosition> {
        self.positions.values().cloned().collect()
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    positions: BTreeMap<String, StoredPosition>,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PositionStore for MemoryPositionStore {
    fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    fn get_position(&self, symbol: &str) -> Option<StoredPosition> {
        self.positions.get(symbol).cloned()
    }

    fn add_position(&mut self, symbol: &str, quantity: f64, price: f64) -> anyhow::Result<()> {
        match self.positions.get_mut(symbol) {
            Some(existing) => {
                let total = existing.quantity + quantity;
                if total != 0.0 {
                    existing.entry_price = (existing.entry_price * existing.quantity
                        + price * quantity)
                        / total;
                }
                existing.quantity = total;
            }
            None => {
                self.positions.insert(
                    symbol.to_string(),
                    StoredPosition {
                        symbol: symbol.to_string(),
                        quantity,
                        entry_price: price,
                        entry_time: Utc::now(),
                    },
                );
            }
        }
        Ok(())
    }

    fn remove_position(&mut self, symbol: &str) -> anyhow::Result<Option<StoredPosition>> {
        Ok(self.positions.remove(symbol))
    }

    fn list_positions(&self) -> Vec<StoredPosition> {
        self.positions.values().cloned().collect()
    }
}
