//! API request/response models

use crate::bets::Bet;
use crate::ledger::Account;
use crate::rewards::RewardStatus;
use crate::rounds::Round;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub account_id: String,
    #[serde(default)]
    pub opening_balance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account_id: String,
    pub balance: u64,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.id,
            balance: account.balance,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoundRequest {
    pub admin_id: String,
    /// Unix milliseconds; defaults to now
    #[serde(default)]
    pub start_time_ms: Option<i64>,
    /// "pending" or "active"; defaults to "pending"
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminActionRequest {
    pub admin_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeclareWinnerRequest {
    pub admin_id: String,
    pub winning_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResponse {
    pub round_id: String,
    pub status: String,
    pub start_time_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_number: Option<String>,
    pub pool_total: u64,
    pub total_payout: u64,
    pub created_by: String,
    pub created_at_ms: i64,
}

impl From<Round> for RoundResponse {
    fn from(round: Round) -> Self {
        Self {
            round_id: round.id,
            status: round.status.to_string(),
            start_time_ms: round.start_time_ms,
            end_time_ms: round.end_time_ms,
            winning_number: round.winning_number,
            pool_total: round.pool_total,
            total_payout: round.total_payout,
            created_by: round.created_by,
            created_at_ms: round.created_at_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListRoundsQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundsResponse {
    pub rounds: Vec<RoundResponse>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBetRequest {
    pub account_id: String,
    pub round_id: String,
    pub selected_number: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetResponse {
    pub bet_id: String,
    pub round_id: String,
    pub account_id: String,
    pub selected_number: String,
    pub amount: u64,
    pub placed_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_winner: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout: Option<u64>,
}

impl From<Bet> for BetResponse {
    fn from(bet: Bet) -> Self {
        Self {
            bet_id: bet.id,
            round_id: bet.round_id,
            account_id: bet.account_id,
            selected_number: bet.selected_number,
            amount: bet.amount,
            placed_at_ms: bet.placed_at_ms,
            is_winner: bet.is_winner,
            payout: bet.payout,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BetsResponse {
    pub bets: Vec<BetResponse>,
}

#[derive(Debug, Deserialize)]
pub struct UserBetsQuery {
    #[serde(default)]
    pub round: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub account_id: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedeemResponse {
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct RewardStatusQuery {
    pub account: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewardStatusResponse {
    pub is_used: bool,
    pub is_expired: bool,
    pub is_available: bool,
    pub time_left_secs: i64,
}

impl From<RewardStatus> for RewardStatusResponse {
    fn from(status: RewardStatus) -> Self {
        Self {
            is_used: status.is_used,
            is_expired: status.is_expired,
            is_available: status.is_available,
            time_left_secs: status.time_left_secs,
        }
    }
}
