//! Round State Machine records
//!
//! A round's lifecycle is `pending → active → completed`, with `cancelled`
//! reachable from the two non-terminal states. Transitions themselves are
//! serialized by the engine under the round's entity lock; this module owns
//! the durable record, the status rules and the recent-rounds index.

use crate::errors::{CoreError, CoreResult};
use crate::storage::Store;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const ROUND_PREFIX: &str = "round:id:";
const ROUND_INDEX_PREFIX: &[u8] = b"round:index:recent:";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl RoundStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundStatus::Completed | RoundStatus::Cancelled)
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundStatus::Pending => "pending",
            RoundStatus::Active => "active",
            RoundStatus::Completed => "completed",
            RoundStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Durable round record. Pool and payout totals are round-owned aggregates,
/// mutated only under the round lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: String,
    pub status: RoundStatus,
    pub start_time_ms: i64,
    pub end_time_ms: Option<i64>,
    /// Canonical winning number, set exactly once at completion
    pub winning_number: Option<String>,
    /// Sum of all bet amounts, monotonically increasing while active
    pub pool_total: u64,
    /// Sum of winning payouts, set at completion
    pub total_payout: u64,
    pub created_by: String,
    pub created_at_ms: i64,
}

impl Round {
    pub fn new(created_by: &str, start_time_ms: i64, status: RoundStatus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status,
            start_time_ms,
            end_time_ms: None,
            winning_number: None,
            pool_total: 0,
            total_payout: 0,
            created_by: created_by.to_string(),
            created_at_ms: Utc::now().timestamp_millis(),
        }
    }

    pub fn accepts_bets(&self) -> bool {
        self.status == RoundStatus::Active
    }
}

pub fn round_key(round_id: &str) -> Vec<u8> {
    format!("{}{}", ROUND_PREFIX, round_id).into_bytes()
}

fn round_index_key(created_at_ms: i64, round_id: &str) -> Vec<u8> {
    // Newest-first listing via an inverted timestamp as the sort key.
    // Key layout: prefix | inv_ts(be) | round_id
    let inv_ts = u64::MAX - created_at_ms as u64;
    let mut key = Vec::with_capacity(ROUND_INDEX_PREFIX.len() + 8 + round_id.len());
    key.extend_from_slice(ROUND_INDEX_PREFIX);
    key.extend_from_slice(&inv_ts.to_be_bytes());
    key.extend_from_slice(round_id.as_bytes());
    key
}

pub struct RoundStore {
    store: Store,
}

impl RoundStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Persist a freshly created round with its index entry.
    pub fn insert(&self, round: &Round) -> CoreResult<()> {
        let items: Vec<(Vec<u8>, Vec<u8>)> = vec![
            (round_key(&round.id), serde_json::to_vec(round)?),
            (round_index_key(round.created_at_ms, &round.id), Vec::new()),
        ];
        self.store.batch_write(&items)?;
        Ok(())
    }

    pub fn load(&self, round_id: &str) -> CoreResult<Round> {
        let bytes = self
            .store
            .get(&round_key(round_id))
            .ok_or_else(|| CoreError::NotFound(format!("round {}", round_id)))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            CoreError::StorageUnavailable(format!("failed to decode round {}: {}", round_id, e))
        })
    }

    /// Stage an updated round record into an atomic batch.
    pub fn stage_update(&self, items: &mut Vec<(Vec<u8>, Vec<u8>)>, round: &Round) -> CoreResult<()> {
        items.push((round_key(&round.id), serde_json::to_vec(round)?));
        Ok(())
    }

    /// Immediate single-record update.
    pub fn update(&self, round: &Round) -> CoreResult<()> {
        self.store
            .put(&round_key(&round.id), &serde_json::to_vec(round)?)?;
        Ok(())
    }

    /// List rounds newest-first, optionally filtered by status.
    pub fn list_recent(&self, status: Option<RoundStatus>, limit: usize) -> CoreResult<Vec<Round>> {
        // Over-scan when filtering so a run of non-matching rounds does not
        // starve the result.
        let scan_limit = if status.is_some() {
            limit.saturating_mul(10)
        } else {
            limit
        }
        .max(1);
        let rows = self.store.scan_prefix(ROUND_INDEX_PREFIX, None, scan_limit);

        let mut rounds = Vec::new();
        for (key, _) in rows {
            if key.len() <= ROUND_INDEX_PREFIX.len() + 8 {
                continue;
            }
            let id_bytes = &key[ROUND_INDEX_PREFIX.len() + 8..];
            let Ok(round_id) = std::str::from_utf8(id_bytes) else {
                continue;
            };
            let round = self.load(round_id)?;
            if status.map_or(true, |s| round.status == s) {
                rounds.push(round);
                if rounds.len() >= limit {
                    break;
                }
            }
        }
        Ok(rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, RoundStore) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, RoundStore::new(store))
    }

    #[test]
    fn test_insert_and_load() {
        let (_dir, rounds) = store();
        let round = Round::new("admin-1", Utc::now().timestamp_millis(), RoundStatus::Active);
        rounds.insert(&round).unwrap();

        let loaded = rounds.load(&round.id).unwrap();
        assert_eq!(loaded.status, RoundStatus::Active);
        assert_eq!(loaded.pool_total, 0);
        assert!(loaded.winning_number.is_none());
    }

    #[test]
    fn test_missing_round() {
        let (_dir, rounds) = store();
        assert!(matches!(rounds.load("nope"), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_list_recent_newest_first() {
        let (_dir, rounds) = store();
        let mut a = Round::new("admin-1", 0, RoundStatus::Pending);
        a.created_at_ms = 1_000;
        let mut b = Round::new("admin-1", 0, RoundStatus::Active);
        b.created_at_ms = 2_000;
        rounds.insert(&a).unwrap();
        rounds.insert(&b).unwrap();

        let listed = rounds.list_recent(None, 10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, b.id);

        let active_only = rounds.list_recent(Some(RoundStatus::Active), 10).unwrap();
        assert_eq!(active_only.len(), 1);
        assert_eq!(active_only[0].id, b.id);
    }

    #[test]
    fn test_list_recent_with_huge_limit() {
        let (_dir, rounds) = store();
        let round = Round::new("admin-1", 0, RoundStatus::Active);
        rounds.insert(&round).unwrap();

        let listed = rounds.list_recent(Some(RoundStatus::Active), usize::MAX).unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn test_terminal_states() {
        assert!(RoundStatus::Completed.is_terminal());
        assert!(RoundStatus::Cancelled.is_terminal());
        assert!(!RoundStatus::Active.is_terminal());
        assert!(!RoundStatus::Pending.is_terminal());
    }
}
