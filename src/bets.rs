//! Bet Store
//!
//! Immutable wager records with a dual key layout: the full record lives
//! under the owning round, plus a per-account index for user lookups. The
//! two settlement fields (`is_winner`, `payout`) are written exactly once,
//! by the settlement batch.

use crate::errors::{CoreError, CoreResult};
use crate::storage::Store;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const BET_ROUND_PREFIX: &str = "bet:round:";
const BET_ACCOUNT_PREFIX: &str = "bet:account:";

/// A single wager by one account on one number within one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub round_id: String,
    pub account_id: String,
    /// Canonical digit string, matched exactly against the winning number
    pub selected_number: String,
    pub amount: u64,
    pub placed_at_ms: i64,
    /// Null until settlement, then written once
    pub is_winner: Option<bool>,
    /// Null until settlement, then written once
    pub payout: Option<u64>,
}

impl Bet {
    pub fn new(round_id: &str, account_id: &str, selected_number: String, amount: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            round_id: round_id.to_string(),
            account_id: account_id.to_string(),
            selected_number,
            amount,
            placed_at_ms: Utc::now().timestamp_millis(),
            is_winner: None,
            payout: None,
        }
    }
}

/// Canonicalize a player-chosen or winning number: must be a non-empty
/// string of ASCII digits that fits a u64; leading zeros are stripped by
/// re-rendering, so "068" and "68" are the same number.
pub fn canonicalize_number(raw: &str) -> CoreResult<String> {
    if raw.is_empty() {
        return Err(CoreError::InvalidInput("number cannot be empty".to_string()));
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidInput(format!(
            "number must contain only digits, got '{}'",
            raw
        )));
    }
    let value: u64 = raw
        .parse()
        .map_err(|_| CoreError::InvalidInput(format!("number '{}' out of range", raw)))?;
    Ok(value.to_string())
}

pub fn bet_round_key(round_id: &str, bet_id: &str) -> Vec<u8> {
    format!("{}{}:{}", BET_ROUND_PREFIX, round_id, bet_id).into_bytes()
}

fn bet_account_key(account_id: &str, bet_id: &str) -> Vec<u8> {
    format!("{}{}:{}", BET_ACCOUNT_PREFIX, account_id, bet_id).into_bytes()
}

pub struct BetStore {
    store: Store,
}

impl BetStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Stage a new bet record and its account index entry into a batch.
    pub fn stage_insert(&self, items: &mut Vec<(Vec<u8>, Vec<u8>)>, bet: &Bet) -> CoreResult<()> {
        items.push((bet_round_key(&bet.round_id, &bet.id), serde_json::to_vec(bet)?));
        items.push((
            bet_account_key(&bet.account_id, &bet.id),
            bet.round_id.as_bytes().to_vec(),
        ));
        Ok(())
    }

    /// Stage the settled form of a bet (outcome fields assigned).
    pub fn stage_update(&self, items: &mut Vec<(Vec<u8>, Vec<u8>)>, bet: &Bet) -> CoreResult<()> {
        items.push((bet_round_key(&bet.round_id, &bet.id), serde_json::to_vec(bet)?));
        Ok(())
    }

    /// Load every bet placed against a round.
    pub fn load_for_round(&self, round_id: &str) -> CoreResult<Vec<Bet>> {
        let prefix = format!("{}{}:", BET_ROUND_PREFIX, round_id).into_bytes();
        let mut bets = Vec::new();
        let mut cursor: Option<Vec<u8>> = None;
        loop {
            let rows = self.store.scan_prefix(&prefix, cursor.as_deref(), 500);
            if rows.is_empty() {
                break;
            }
            cursor = Some(rows.last().map(|(k, _)| k.clone()).unwrap_or_default());
            for (key, value) in rows {
                let bet: Bet = serde_json::from_slice(&value).map_err(|e| {
                    CoreError::StorageUnavailable(format!(
                        "failed to decode bet {}: {}",
                        String::from_utf8_lossy(&key),
                        e
                    ))
                })?;
                bets.push(bet);
            }
        }
        Ok(bets)
    }

    /// Load an account's bets, optionally restricted to one round.
    pub fn load_for_account(&self, account_id: &str, round_id: Option<&str>) -> CoreResult<Vec<Bet>> {
        let prefix = format!("{}{}:", BET_ACCOUNT_PREFIX, account_id).into_bytes();
        let rows = self.store.scan_prefix(&prefix, None, usize::MAX);

        let mut bets = Vec::new();
        for (key, value) in rows {
            let owning_round = String::from_utf8_lossy(&value).to_string();
            if let Some(filter) = round_id {
                if owning_round != filter {
                    continue;
                }
            }
            let bet_id = key[prefix.len()..].to_vec();
            let bet_id = String::from_utf8_lossy(&bet_id).to_string();
            let Some(bytes) = self.store.get(&bet_round_key(&owning_round, &bet_id)) else {
                tracing::warn!(account_id, bet_id, "bet index entry without record");
                continue;
            };
            bets.push(serde_json::from_slice(&bytes)?);
        }
        Ok(bets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bet_store() -> (TempDir, Store, BetStore) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let bets = BetStore::new(store.clone());
        (dir, store, bets)
    }

    fn insert(store: &Store, bets: &BetStore, bet: &Bet) {
        let mut items = Vec::new();
        bets.stage_insert(&mut items, bet).unwrap();
        store.batch_write(&items).unwrap();
    }

    #[test]
    fn test_canonicalize_number() {
        assert_eq!(canonicalize_number("68").unwrap(), "68");
        assert_eq!(canonicalize_number("068").unwrap(), "68");
        assert_eq!(canonicalize_number("7").unwrap(), "7");
        assert_eq!(canonicalize_number("007").unwrap(), "7");
        assert_eq!(canonicalize_number("0").unwrap(), "0");

        assert!(canonicalize_number("").is_err());
        assert!(canonicalize_number("6a").is_err());
        assert!(canonicalize_number("-1").is_err());
        assert!(canonicalize_number("99999999999999999999999").is_err());
    }

    #[test]
    fn test_round_and_account_lookup() {
        let (_dir, store, bets) = bet_store();
        let b1 = Bet::new("r-1", "u-1", "68".to_string(), 10_000);
        let b2 = Bet::new("r-1", "u-2", "7".to_string(), 20_000);
        let b3 = Bet::new("r-2", "u-1", "7".to_string(), 15_000);
        insert(&store, &bets, &b1);
        insert(&store, &bets, &b2);
        insert(&store, &bets, &b3);

        let round_bets = bets.load_for_round("r-1").unwrap();
        assert_eq!(round_bets.len(), 2);

        let user_bets = bets.load_for_account("u-1", None).unwrap();
        assert_eq!(user_bets.len(), 2);

        let user_round_bets = bets.load_for_account("u-1", Some("r-2")).unwrap();
        assert_eq!(user_round_bets.len(), 1);
        assert_eq!(user_round_bets[0].amount, 15_000);
    }

    #[test]
    fn test_new_bet_has_no_outcome() {
        let bet = Bet::new("r-1", "u-1", "68".to_string(), 10_000);
        assert!(bet.is_winner.is_none());
        assert!(bet.payout.is_none());
    }
}
