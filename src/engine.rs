//! Game engine
//!
//! Wires the ledger, the round/bet/reward stores and the settlement
//! computation behind the boundary operations, and owns the per-entity
//! lock registry that serializes what must be mutually exclusive:
//! balance mutations per account, state transitions and pool increments
//! per round, redemption per code.
//!
//! Lock order is fixed — round before account, code before account — so
//! the two multi-lock paths (placement/settlement and redemption) cannot
//! deadlock. Account locks inside one operation are taken in sorted
//! order.

use crate::audit::AuditLog;
use crate::bets::{canonicalize_number, Bet, BetStore};
use crate::config::GameConfig;
use crate::errors::{CoreError, CoreResult};
use crate::ledger::{AdjustReason, Account, Ledger};
use crate::rewards::{RewardCode, RewardStatus, RewardVault};
use crate::rounds::{Round, RoundStatus, RoundStore};
use crate::settlement::{compute_outcomes, RewardIssued, SettlementReport};
use crate::storage::Store;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

/// How long a single lock acquisition may wait before it counts as
/// contention, and how many acquisitions are attempted before the
/// operation surfaces `StorageConflict`.
const LOCK_WAIT: std::time::Duration = std::time::Duration::from_secs(2);
const LOCK_ATTEMPTS: u32 = 3;
const LOCK_BACKOFF: std::time::Duration = std::time::Duration::from_millis(50);

/// Registry size past which idle entries are swept on the next acquire
const LOCK_SWEEP_THRESHOLD: usize = 1024;

/// Per-entity async locks, created on first use. Entries whose mutex is
/// neither held nor waited on (strong count 1, the map's own reference) are
/// swept once the registry grows past the threshold, so the map stays
/// bounded by the working set rather than every entity ever touched.
struct LockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockRegistry {
    fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    async fn acquire(&self, key: &str) -> CoreResult<OwnedMutexGuard<()>> {
        if self.locks.len() > LOCK_SWEEP_THRESHOLD {
            self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        for attempt in 0..LOCK_ATTEMPTS {
            match timeout(LOCK_WAIT, lock.clone().lock_owned()).await {
                Ok(guard) => return Ok(guard),
                Err(_) if attempt + 1 < LOCK_ATTEMPTS => {
                    tokio::time::sleep(LOCK_BACKOFF).await;
                }
                Err(_) => break,
            }
        }
        Err(CoreError::StorageConflict(key.to_string()))
    }
}

fn round_lock_key(round_id: &str) -> String {
    format!("round:{}", round_id)
}

fn account_lock_key(account_id: &str) -> String {
    format!("account:{}", account_id)
}

fn reward_lock_key(code: &str) -> String {
    format!("reward:{}", code)
}

pub struct GameEngine {
    store: Store,
    ledger: Ledger,
    rounds: RoundStore,
    bets: BetStore,
    vault: RewardVault,
    audit: Arc<AuditLog>,
    config: GameConfig,
    locks: LockRegistry,
}

impl GameEngine {
    pub fn new(store: Store, config: GameConfig) -> Self {
        let audit = Arc::new(AuditLog::new(store.clone()));
        Self {
            ledger: Ledger::new(store.clone(), audit.clone()),
            rounds: RoundStore::new(store.clone()),
            bets: BetStore::new(store.clone()),
            vault: RewardVault::new(store.clone()),
            audit,
            config,
            locks: LockRegistry::new(),
            store,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    fn require_admin(&self, actor: &str) -> CoreResult<()> {
        if self.config.admin_accounts.iter().any(|a| a == actor) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "account {} is not an administrator",
                actor
            )))
        }
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    pub async fn create_account(&self, account_id: &str, opening_balance: u64) -> CoreResult<Account> {
        let _guard = self.locks.acquire(&account_lock_key(account_id)).await?;
        self.ledger.create_account(account_id, opening_balance)
    }

    pub fn get_balance(&self, account_id: &str) -> CoreResult<u64> {
        self.ledger.get_balance(account_id)
    }

    /// Top up an account outside of any round (deposit path).
    pub async fn deposit(&self, account_id: &str, amount: u64) -> CoreResult<u64> {
        if amount == 0 {
            return Err(CoreError::InvalidInput("deposit amount cannot be zero".to_string()));
        }
        let _guard = self.locks.acquire(&account_lock_key(account_id)).await?;
        self.ledger
            .credit(account_id, amount, AdjustReason::CreditForDeposit)
    }

    // ------------------------------------------------------------------
    // Round lifecycle
    // ------------------------------------------------------------------

    pub async fn create_round(
        &self,
        admin_id: &str,
        start_time_ms: i64,
        initial_status: RoundStatus,
    ) -> CoreResult<Round> {
        self.require_admin(admin_id)?;
        if !matches!(initial_status, RoundStatus::Pending | RoundStatus::Active) {
            return Err(CoreError::InvalidInput(format!(
                "rounds can only be created pending or active, got {}",
                initial_status
            )));
        }

        let round = Round::new(admin_id, start_time_ms, initial_status);
        self.rounds.insert(&round)?;
        self.audit.record(
            "round.create",
            admin_id,
            format!("round {} created {}", round.id, round.status),
        );
        tracing::info!(round_id = %round.id, status = %round.status, "round created");
        Ok(round)
    }

    pub async fn activate_round(&self, admin_id: &str, round_id: &str) -> CoreResult<Round> {
        self.require_admin(admin_id)?;
        let _guard = self.locks.acquire(&round_lock_key(round_id)).await?;

        let mut round = self.rounds.load(round_id)?;
        if round.status != RoundStatus::Pending {
            return Err(CoreError::InvalidState(format!(
                "round {} is {}, only pending rounds can be activated",
                round_id, round.status
            )));
        }
        round.status = RoundStatus::Active;
        self.rounds.update(&round)?;
        self.audit
            .record("round.activate", admin_id, format!("round {}", round_id));
        Ok(round)
    }

    /// Cancel a non-terminal round and refund every bet placed against it.
    /// Refunds and the terminal transition commit as one batch.
    pub async fn cancel_round(&self, admin_id: &str, round_id: &str) -> CoreResult<Round> {
        self.require_admin(admin_id)?;
        let _round_guard = self.locks.acquire(&round_lock_key(round_id)).await?;

        let mut round = self.rounds.load(round_id)?;
        if round.status.is_terminal() {
            return Err(CoreError::InvalidState(format!(
                "round {} is already {}",
                round_id, round.status
            )));
        }

        let round_bets = self.bets.load_for_round(round_id)?;

        // One refund per account: a second staged adjustment would read the
        // balance from before the first, so amounts are aggregated first.
        let mut refunds: BTreeMap<String, u64> = BTreeMap::new();
        for bet in &round_bets {
            *refunds.entry(bet.account_id.clone()).or_default() += bet.amount;
        }

        let mut items = Vec::new();
        let mut account_guards = Vec::with_capacity(refunds.len());
        for (account_id, amount) in &refunds {
            account_guards.push(self.locks.acquire(&account_lock_key(account_id)).await?);
            self.ledger
                .stage_credit(&mut items, account_id, *amount, AdjustReason::CreditForRefund)?;
        }

        round.status = RoundStatus::Cancelled;
        round.end_time_ms = Some(Utc::now().timestamp_millis());
        self.rounds.stage_update(&mut items, &round)?;
        self.audit.stage(
            &mut items,
            "round.cancel",
            admin_id,
            format!("round {} cancelled, {} bets refunded", round_id, round_bets.len()),
        );

        self.store.batch_write(&items)?;
        tracing::info!(round_id, refunded_bets = round_bets.len(), "round cancelled");
        Ok(round)
    }

    pub fn get_round(&self, round_id: &str) -> CoreResult<Round> {
        self.rounds.load(round_id)
    }

    pub fn list_rounds(&self, status: Option<RoundStatus>, limit: usize) -> CoreResult<Vec<Round>> {
        self.rounds.list_recent(status, limit)
    }

    // ------------------------------------------------------------------
    // Bet placement
    // ------------------------------------------------------------------

    /// Place a wager. The debit, the bet record and the pool increment
    /// commit as one batch, under the round lock (which also guarantees the
    /// round cannot complete between the status check and the commit) and
    /// the account lock (which makes the balance check linearizable).
    pub async fn place_bet(
        &self,
        account_id: &str,
        round_id: &str,
        selected_number: &str,
        amount: u64,
    ) -> CoreResult<Bet> {
        let number = canonicalize_number(selected_number)?;
        if amount < self.config.min_stake {
            return Err(CoreError::InvalidInput(format!(
                "amount {} is below the minimum stake {}",
                amount, self.config.min_stake
            )));
        }

        let _round_guard = self.locks.acquire(&round_lock_key(round_id)).await?;
        let mut round = self.rounds.load(round_id)?;
        if !round.accepts_bets() {
            return Err(CoreError::RoundNotActive(round_id.to_string()));
        }

        let _account_guard = self.locks.acquire(&account_lock_key(account_id)).await?;

        let mut items = Vec::new();
        self.ledger
            .stage_debit(&mut items, account_id, amount, AdjustReason::DebitForBet)?;

        let bet = Bet::new(round_id, account_id, number, amount);
        self.bets.stage_insert(&mut items, &bet)?;

        round.pool_total = round
            .pool_total
            .checked_add(amount)
            .ok_or_else(|| CoreError::InvalidInput("pool total overflow".to_string()))?;
        self.rounds.stage_update(&mut items, &round)?;
        self.audit.stage(
            &mut items,
            "bet.place",
            account_id,
            format!("bet {} on {} for {} in round {}", bet.id, bet.selected_number, amount, round_id),
        );

        self.store.batch_write(&items)?;
        tracing::debug!(round_id, account_id, amount, number = %bet.selected_number, "bet placed");
        Ok(bet)
    }

    pub fn get_bets_for_round(&self, round_id: &str) -> CoreResult<Vec<Bet>> {
        // Surface NotFound for unknown rounds rather than an empty list.
        self.rounds.load(round_id)?;
        self.bets.load_for_round(round_id)
    }

    pub fn get_user_bets(&self, account_id: &str, round_id: Option<&str>) -> CoreResult<Vec<Bet>> {
        self.bets.load_for_account(account_id, round_id)
    }

    // ------------------------------------------------------------------
    // Settlement
    // ------------------------------------------------------------------

    /// Declare the winning number and settle the round.
    ///
    /// The transition to `completed`, every bet's outcome fields, every
    /// winner's payout credit and every reward code commit in a single
    /// batch, so a second invocation can only ever observe `completed` and
    /// fail with `InvalidState` — settlement runs exactly once per round.
    pub async fn declare_winner(
        &self,
        admin_id: &str,
        round_id: &str,
        winning_number: &str,
    ) -> CoreResult<SettlementReport> {
        self.require_admin(admin_id)?;
        let winning_number = canonicalize_number(winning_number)?;

        let _round_guard = self.locks.acquire(&round_lock_key(round_id)).await?;
        let mut round = self.rounds.load(round_id)?;
        if round.status != RoundStatus::Active {
            return Err(CoreError::InvalidState(format!(
                "round {} is {}, only active rounds can be settled",
                round_id, round.status
            )));
        }

        let round_bets = self.bets.load_for_round(round_id)?;
        let bet_count = round_bets.len();
        let outcome = compute_outcomes(round_bets, &winning_number, self.config.payout_multiplier)?;

        // Aggregate credits per account, then lock accounts in sorted order.
        let mut credits: BTreeMap<String, u64> = BTreeMap::new();
        for winner in &outcome.winners {
            *credits.entry(winner.account_id.clone()).or_default() += winner.payout;
        }

        let mut items = Vec::new();
        let mut account_guards = Vec::with_capacity(credits.len());
        for (account_id, payout) in &credits {
            account_guards.push(self.locks.acquire(&account_lock_key(account_id)).await?);
            self.ledger
                .stage_credit(&mut items, account_id, *payout, AdjustReason::CreditForPayout)?;
        }

        let expires_at_ms =
            (Utc::now() + Duration::hours(self.config.reward_expiry_hours)).timestamp_millis();
        let mut rewards = Vec::with_capacity(outcome.winners.len());
        for winner in &outcome.winners {
            let code = RewardCode::issue(&winner.account_id, round_id, winner.payout, expires_at_ms);
            self.vault.stage_insert(&mut items, &code)?;
            rewards.push(RewardIssued {
                account_id: winner.account_id.clone(),
                bet_id: winner.bet_id.clone(),
                code: code.code,
                amount: code.amount,
                expires_at_ms,
            });
        }

        for bet in &outcome.settled_bets {
            self.bets.stage_update(&mut items, bet)?;
        }

        round.status = RoundStatus::Completed;
        round.winning_number = Some(winning_number.clone());
        round.total_payout = outcome.total_payout;
        round.end_time_ms = Some(Utc::now().timestamp_millis());
        self.rounds.stage_update(&mut items, &round)?;
        self.audit.stage(
            &mut items,
            "round.settle",
            admin_id,
            format!(
                "round {} winner {}, {} winners paid {}",
                round_id,
                winning_number,
                outcome.winners.len(),
                outcome.total_payout
            ),
        );

        self.store.batch_write(&items)?;
        tracing::info!(
            round_id,
            winning_number = %winning_number,
            winners = outcome.winners.len(),
            total_payout = outcome.total_payout,
            "round settled"
        );

        Ok(SettlementReport {
            round_id: round_id.to_string(),
            winning_number,
            bet_count,
            winner_count: outcome.winners.len(),
            pool_total: round.pool_total,
            total_payout: outcome.total_payout,
            rewards,
        })
    }

    // ------------------------------------------------------------------
    // Reward redemption
    // ------------------------------------------------------------------

    /// Redeem a reward code for the owning account. The used-flag flip and
    /// the balance credit commit together; concurrent attempts serialize on
    /// the code lock, so exactly one succeeds.
    pub async fn redeem_reward(&self, account_id: &str, code: &str) -> CoreResult<u64> {
        let _code_guard = self.locks.acquire(&reward_lock_key(code)).await?;

        let now_ms = Utc::now().timestamp_millis();
        let record = self.vault.check_redeemable(code, account_id, now_ms)?;

        let _account_guard = self.locks.acquire(&account_lock_key(account_id)).await?;

        let mut items = Vec::new();
        self.ledger.stage_credit(
            &mut items,
            account_id,
            record.amount,
            AdjustReason::CreditForReward,
        )?;
        self.vault.stage_mark_used(&mut items, &record)?;
        self.audit.stage(
            &mut items,
            "reward.redeem",
            account_id,
            format!("code {} for {}", code, record.amount),
        );

        self.store.batch_write(&items)?;
        tracing::info!(account_id, code, amount = record.amount, "reward redeemed");
        Ok(record.amount)
    }

    pub fn get_reward_status(&self, code: &str, account_id: &str) -> CoreResult<RewardStatus> {
        self.vault
            .status(code, account_id, Utc::now().timestamp_millis())
    }
}
