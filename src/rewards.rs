//! Reward Vault
//!
//! Redeemable codes issued by settlement to winning accounts. A code is
//! one-way: `is_used` flips false→true exactly once, and that flip commits
//! in the same batch as the balance credit. Ownership and expiry are
//! checked before any mutation.

use crate::errors::{CoreError, CoreResult};
use crate::storage::Store;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const REWARD_PREFIX: &str = "reward:code:";
const CODE_LEN: usize = 16;

/// Durable reward code record, owned by the account it was issued to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardCode {
    pub id: String,
    pub code: String,
    pub account_id: String,
    pub round_id: String,
    pub amount: u64,
    pub expires_at_ms: i64,
    pub is_used: bool,
    pub issued_at_ms: i64,
}

impl RewardCode {
    pub fn issue(account_id: &str, round_id: &str, amount: u64, expires_at_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            code: generate_code(),
            account_id: account_id.to_string(),
            round_id: round_id.to_string(),
            amount,
            expires_at_ms,
            is_used: false,
            issued_at_ms: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms
    }
}

fn generate_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(char::from)
        .collect();
    format!("RW-{}", suffix.to_uppercase())
}

/// Redemption-state snapshot for status queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardStatus {
    pub is_used: bool,
    pub is_expired: bool,
    pub is_available: bool,
    /// Seconds until expiry; zero once expired
    pub time_left_secs: i64,
}

pub fn reward_key(code: &str) -> Vec<u8> {
    format!("{}{}", REWARD_PREFIX, code).into_bytes()
}

pub struct RewardVault {
    store: Store,
}

impl RewardVault {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Stage a freshly issued code into a settlement batch.
    pub fn stage_insert(&self, items: &mut Vec<(Vec<u8>, Vec<u8>)>, code: &RewardCode) -> CoreResult<()> {
        items.push((reward_key(&code.code), serde_json::to_vec(code)?));
        Ok(())
    }

    /// Stage the used form of a code into a redemption batch.
    pub fn stage_mark_used(&self, items: &mut Vec<(Vec<u8>, Vec<u8>)>, code: &RewardCode) -> CoreResult<()> {
        let mut used = code.clone();
        used.is_used = true;
        items.push((reward_key(&used.code), serde_json::to_vec(&used)?));
        Ok(())
    }

    pub fn load(&self, code: &str) -> CoreResult<RewardCode> {
        let bytes = self
            .store
            .get(&reward_key(code))
            .ok_or_else(|| CoreError::NotFound(format!("reward code {}", code)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Validate a code against the redeeming account without mutating it.
    /// Returns the record only if it is redeemable right now.
    pub fn check_redeemable(&self, code: &str, account_id: &str, now_ms: i64) -> CoreResult<RewardCode> {
        let record = self.load(code)?;
        if record.account_id != account_id {
            return Err(CoreError::Forbidden(format!(
                "reward code is not owned by account {}",
                account_id
            )));
        }
        if record.is_used {
            return Err(CoreError::AlreadyRedeemed);
        }
        if record.is_expired_at(now_ms) {
            return Err(CoreError::Expired);
        }
        Ok(record)
    }

    /// Status snapshot for the owning account.
    pub fn status(&self, code: &str, account_id: &str, now_ms: i64) -> CoreResult<RewardStatus> {
        let record = self.load(code)?;
        if record.account_id != account_id {
            return Err(CoreError::Forbidden(format!(
                "reward code is not owned by account {}",
                account_id
            )));
        }
        let is_expired = record.is_expired_at(now_ms);
        Ok(RewardStatus {
            is_used: record.is_used,
            is_expired,
            is_available: !record.is_used && !is_expired,
            time_left_secs: ((record.expires_at_ms - now_ms).max(0)) / 1_000,
        })
    }
}
