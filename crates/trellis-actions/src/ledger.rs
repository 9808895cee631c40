//! Purchase journal persistence.
//!
//! The gate provides no mutual exclusion across concurrent calls; the
//! duplicate-order rejection here is the at-most-once guarantee for
//! purchases.

use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

const LEDGER_FILE: &str = "purchases.jsonl";

/// Errors returned by the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported schema version: {0}")]
    UnsupportedSchema(u32),
    #[error("duplicate order: {0}")]
    DuplicateOrder(String),
}

/// One persisted purchase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseRecord {
    /// Record id.
    pub id: Uuid,
    /// Buyer reference, e.g. `user:alice`.
    pub user: String,
    /// Asset symbol, uppercased.
    pub symbol: String,
    /// Number of shares.
    pub quantity: u32,
    /// Total price in cents.
    pub total_cents: i64,
    /// Caller-supplied idempotency key.
    pub client_order_id: String,
    /// Purchase timestamp.
    pub created_at: DateTime<Utc>,
}

/// Internal JSONL event representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LedgerEvent {
    SchemaVersion { version: u32 },
    Purchase { record: PurchaseRecord },
}

/// JSONL-backed purchase journal.
pub struct TradeLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TradeLedger {
    /// Open or create the journal under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let path = root.join(LEDGER_FILE);
        if !path.exists() {
            let mut file = OpenOptions::new().create_new(true).write(true).open(&path)?;
            let header = serde_json::to_string(&LedgerEvent::SchemaVersion { version: 1 })?;
            writeln!(file, "{header}")?;
        }
        info!("initialized trade ledger (path={})", path.display());
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Append a purchase, rejecting a duplicate order id for the same user.
    pub fn append(&self, record: PurchaseRecord) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock();
        let existing = self.load_all()?;
        if existing.iter().any(|prior| {
            prior.user == record.user && prior.client_order_id == record.client_order_id
        }) {
            return Err(LedgerError::DuplicateOrder(record.client_order_id));
        }
        debug!(
            "recording purchase (user={}, symbol={}, quantity={})",
            record.user, record.symbol, record.quantity
        );
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let line = serde_json::to_string(&LedgerEvent::Purchase { record })?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// All purchases recorded for one user, in journal order.
    pub fn list_for_user(&self, user: &str) -> Result<Vec<PurchaseRecord>, LedgerError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|record| record.user == user)
            .collect())
    }

    fn load_all(&self) -> Result<Vec<PurchaseRecord>, LedgerError> {
        let file = OpenOptions::new().read(true).open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line)? {
                LedgerEvent::SchemaVersion { version } => {
                    if version > 1 {
                        return Err(LedgerError::UnsupportedSchema(version));
                    }
                }
                LedgerEvent::Purchase { record } => records.push(record),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::{LedgerError, PurchaseRecord, TradeLedger};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn record(user: &str, order_id: &str) -> PurchaseRecord {
        PurchaseRecord {
            id: Uuid::new_v4(),
            user: user.to_string(),
            symbol: "NVDA".to_string(),
            quantity: 2,
            total_cents: 24_000,
            client_order_id: order_id.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn append_and_list_round_trip() {
        let temp = tempdir().expect("tempdir");
        let ledger = TradeLedger::new(temp.path()).expect("ledger");
        let first = record("user:alice", "order-1");
        ledger.append(first.clone()).expect("append");
        ledger.append(record("user:bob", "order-1")).expect("other user");

        let purchases = ledger.list_for_user("user:alice").expect("list");
        assert_eq!(purchases, vec![first]);
    }

    #[test]
    fn duplicate_order_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let ledger = TradeLedger::new(temp.path()).expect("ledger");
        ledger.append(record("user:alice", "order-1")).expect("first");
        let err = ledger
            .append(record("user:alice", "order-1"))
            .expect_err("duplicate");
        let LedgerError::DuplicateOrder(order_id) = err else {
            panic!("expected duplicate order");
        };
        assert_eq!(order_id, "order-1");
    }
}
