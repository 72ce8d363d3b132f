//! Balance Ledger
//!
//! Sole owner of account balances. Every mutation is an explicit unsigned
//! debit or credit (staged into an atomic batch, or committed immediately),
//! carries a reason code for audit, and can never drive a balance negative.
//! Amounts stay `u64` end to end, so no cast can truncate an extreme value
//! into the wrong direction.
//!
//! Locking contract: callers hold the account's entity lock for the full
//! span of a check + commit. The ledger itself does no locking, which keeps
//! it usable inside multi-account batches (settlement) without nested locks.

use crate::audit::AuditLog;
use crate::errors::{CoreError, CoreResult};
use crate::storage::Store;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

const ACCOUNT_PREFIX: &str = "account:";

/// Reason code attached to every balance mutation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustReason {
    DebitForBet,
    CreditForPayout,
    CreditForReward,
    CreditForRefund,
    CreditForDeposit,
}

impl fmt::Display for AdjustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdjustReason::DebitForBet => "debit-for-bet",
            AdjustReason::CreditForPayout => "credit-for-payout",
            AdjustReason::CreditForReward => "credit-for-reward",
            AdjustReason::CreditForRefund => "credit-for-refund",
            AdjustReason::CreditForDeposit => "credit-for-deposit",
        };
        write!(f, "{}", s)
    }
}

/// Durable account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Spendable balance in the smallest currency unit. Never negative.
    pub balance: u64,
    pub created_at_ms: i64,
}

pub fn account_key(account_id: &str) -> Vec<u8> {
    format!("{}{}", ACCOUNT_PREFIX, account_id).into_bytes()
}

pub struct Ledger {
    store: Store,
    audit: Arc<AuditLog>,
}

impl Ledger {
    pub fn new(store: Store, audit: Arc<AuditLog>) -> Self {
        Self { store, audit }
    }

    /// Create an account with an optional opening balance.
    pub fn create_account(&self, account_id: &str, opening_balance: u64) -> CoreResult<Account> {
        if account_id.is_empty() {
            return Err(CoreError::InvalidInput("account id cannot be empty".to_string()));
        }
        let key = account_key(account_id);
        if self.store.get(&key).is_some() {
            return Err(CoreError::InvalidState(format!(
                "account {} already exists",
                account_id
            )));
        }

        let account = Account {
            id: account_id.to_string(),
            balance: opening_balance,
            created_at_ms: Utc::now().timestamp_millis(),
        };
        self.store.put(&key, &serde_json::to_vec(&account)?)?;
        if opening_balance > 0 {
            self.audit.record(
                "ledger.adjust",
                account_id,
                format!("{} +{}", AdjustReason::CreditForDeposit, opening_balance),
            );
        }
        Ok(account)
    }

    pub fn load_account(&self, account_id: &str) -> CoreResult<Account> {
        let bytes = self
            .store
            .get(&account_key(account_id))
            .ok_or_else(|| CoreError::NotFound(format!("account {}", account_id)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn get_balance(&self, account_id: &str) -> CoreResult<u64> {
        Ok(self.load_account(account_id)?.balance)
    }

    /// Check the debit and stage the updated account record plus its audit
    /// row into `items`. Nothing is durable until the caller commits the
    /// batch; the caller holds the account lock until then.
    ///
    /// Returns the balance the account will have once the batch commits.
    pub fn stage_debit(
        &self,
        items: &mut Vec<(Vec<u8>, Vec<u8>)>,
        account_id: &str,
        amount: u64,
        reason: AdjustReason,
    ) -> CoreResult<u64> {
        let account = self.load_account(account_id)?;
        let new_balance = account.balance.checked_sub(amount).ok_or(CoreError::InsufficientFunds {
            balance: account.balance,
            required: amount,
        })?;
        self.stage_balance(items, account, new_balance, reason, format!("-{}", amount))
    }

    /// Credit counterpart of [`Ledger::stage_debit`], guarding the upper
    /// bound of the balance instead of the lower one.
    pub fn stage_credit(
        &self,
        items: &mut Vec<(Vec<u8>, Vec<u8>)>,
        account_id: &str,
        amount: u64,
        reason: AdjustReason,
    ) -> CoreResult<u64> {
        let account = self.load_account(account_id)?;
        let new_balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::InvalidInput("balance overflow".to_string()))?;
        self.stage_balance(items, account, new_balance, reason, format!("+{}", amount))
    }

    fn stage_balance(
        &self,
        items: &mut Vec<(Vec<u8>, Vec<u8>)>,
        mut account: Account,
        new_balance: u64,
        reason: AdjustReason,
        detail: String,
    ) -> CoreResult<u64> {
        account.balance = new_balance;
        items.push((account_key(&account.id), serde_json::to_vec(&account)?));
        self.audit.stage(
            items,
            "ledger.adjust",
            &account.id,
            format!("{} {}", reason, detail),
        );
        Ok(new_balance)
    }

    /// Atomic standalone debit: check, write and audit in one commit.
    pub fn debit(&self, account_id: &str, amount: u64, reason: AdjustReason) -> CoreResult<u64> {
        let mut items = Vec::with_capacity(2);
        let new_balance = self.stage_debit(&mut items, account_id, amount, reason)?;
        self.store.batch_write(&items)?;
        tracing::debug!(account_id, amount, %reason, new_balance, "ledger debited");
        Ok(new_balance)
    }

    /// Atomic standalone credit: check, write and audit in one commit.
    pub fn credit(&self, account_id: &str, amount: u64, reason: AdjustReason) -> CoreResult<u64> {
        let mut items = Vec::with_capacity(2);
        let new_balance = self.stage_credit(&mut items, account_id, amount, reason)?;
        self.store.batch_write(&items)?;
        tracing::debug!(account_id, amount, %reason, new_balance, "ledger credited");
        Ok(new_balance)
    }
}
