//! Append-only audit log
//!
//! One entry per state-changing operation. The log is a sink: the core
//! writes to it for attribution but never reads it back for correctness,
//! so a failed append is logged and swallowed.

use crate::storage::Store;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

const AUDIT_PREFIX: &[u8] = b"audit:";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub actor: String,
    pub detail: String,
    pub timestamp_ms: i64,
}

pub struct AuditLog {
    store: Store,
    seq: AtomicU64,
}

impl AuditLog {
    pub fn new(store: Store) -> Self {
        // Resume the sequence after the last persisted entry, so a restart
        // within the same millisecond cannot reuse a key and overwrite it.
        let next_seq = store
            .last_key_under_prefix(AUDIT_PREFIX)
            .and_then(|key| {
                let seq_bytes: [u8; 8] = key.get(AUDIT_PREFIX.len() + 8..)?.try_into().ok()?;
                Some(u64::from_be_bytes(seq_bytes) + 1)
            })
            .unwrap_or(0);
        Self {
            store,
            seq: AtomicU64::new(next_seq),
        }
    }

    fn entry_key(&self, timestamp_ms: i64) -> Vec<u8> {
        // ts(be) | seq(be) keeps entries in insertion order even within
        // the same millisecond.
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let mut key = Vec::with_capacity(AUDIT_PREFIX.len() + 16);
        key.extend_from_slice(AUDIT_PREFIX);
        key.extend_from_slice(&(timestamp_ms as u64).to_be_bytes());
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    /// Record an action. Best effort: storage failures are traced, not surfaced.
    pub fn record(&self, action: &str, actor: &str, detail: String) {
        let entry = AuditEntry {
            action: action.to_string(),
            actor: actor.to_string(),
            detail,
            timestamp_ms: Utc::now().timestamp_millis(),
        };

        let key = self.entry_key(entry.timestamp_ms);
        match serde_json::to_vec(&entry) {
            Ok(bytes) => {
                if let Err(e) = self.store.put(&key, &bytes) {
                    tracing::warn!(action, actor, "failed to append audit entry: {}", e);
                }
            }
            Err(e) => tracing::warn!(action, "failed to encode audit entry: {}", e),
        }
    }

    /// Stage an audit entry into an existing atomic batch.
    pub fn stage(&self, items: &mut Vec<(Vec<u8>, Vec<u8>)>, action: &str, actor: &str, detail: String) {
        let entry = AuditEntry {
            action: action.to_string(),
            actor: actor.to_string(),
            detail,
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        if let Ok(bytes) = serde_json::to_vec(&entry) {
            items.push((self.entry_key(entry.timestamp_ms), bytes));
        }
    }
}
