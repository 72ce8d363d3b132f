//! Settlement Engine
//!
//! Pure winner/payout computation for a completed round. The engine runs
//! this exactly once per round, under the round lock, and commits every
//! settlement write in the same batch as the round's transition to
//! `completed` — the computation here never touches storage itself.

use crate::bets::Bet;
use crate::errors::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// One winning bet's payout assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerPayout {
    pub bet_id: String,
    pub account_id: String,
    pub bet_amount: u64,
    pub payout: u64,
}

/// Outcome of the settlement computation for a round
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    /// Every bet of the round with its outcome fields assigned
    pub settled_bets: Vec<Bet>,
    pub winners: Vec<WinnerPayout>,
    pub total_payout: u64,
}

/// Summary returned to the admin who declared the winner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub round_id: String,
    pub winning_number: String,
    pub bet_count: usize,
    pub winner_count: usize,
    pub pool_total: u64,
    pub total_payout: u64,
    pub rewards: Vec<RewardIssued>,
}

/// Reward code issuance record included in the settlement report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardIssued {
    pub account_id: String,
    pub bet_id: String,
    pub code: String,
    pub amount: u64,
    pub expires_at_ms: i64,
}

/// Assign `is_winner` and `payout` to every bet of a round.
///
/// Winning rule: exact match of the bet's canonical selected number against
/// the canonical winning number. Payout is `amount * multiplier`, applied
/// uniformly; checked arithmetic guards the aggregate totals.
pub fn compute_outcomes(
    bets: Vec<Bet>,
    winning_number: &str,
    payout_multiplier: u64,
) -> CoreResult<SettlementOutcome> {
    let mut settled_bets = Vec::with_capacity(bets.len());
    let mut winners = Vec::new();
    let mut total_payout: u64 = 0;

    for mut bet in bets {
        let is_winner = bet.selected_number == winning_number;
        let payout = if is_winner {
            bet.amount.checked_mul(payout_multiplier).ok_or_else(|| {
                CoreError::InvalidInput(format!("payout overflow for bet {}", bet.id))
            })?
        } else {
            0
        };

        bet.is_winner = Some(is_winner);
        bet.payout = Some(payout);

        if is_winner {
            total_payout = total_payout.checked_add(payout).ok_or_else(|| {
                CoreError::InvalidInput("total payout overflow".to_string())
            })?;
            winners.push(WinnerPayout {
                bet_id: bet.id.clone(),
                account_id: bet.account_id.clone(),
                bet_amount: bet.amount,
                payout,
            });
        }
        settled_bets.push(bet);
    }

    Ok(SettlementOutcome {
        settled_bets,
        winners,
        total_payout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bet(account: &str, number: &str, amount: u64) -> Bet {
        Bet::new("r-1", account, number.to_string(), amount)
    }

    #[test]
    fn test_exact_match_only() {
        let bets = vec![bet("u-1", "68", 10_000), bet("u-2", "6", 10_000), bet("u-3", "688", 10_000)];
        let outcome = compute_outcomes(bets, "68", 80).unwrap();

        assert_eq!(outcome.winners.len(), 1);
        assert_eq!(outcome.winners[0].account_id, "u-1");
        assert_eq!(outcome.winners[0].payout, 800_000);
        assert_eq!(outcome.total_payout, 800_000);
    }

    #[test]
    fn test_every_bet_gets_outcome_fields() {
        let bets = vec![bet("u-1", "7", 10_000), bet("u-2", "8", 10_000)];
        let outcome = compute_outcomes(bets, "7", 80).unwrap();

        for b in &outcome.settled_bets {
            assert!(b.is_winner.is_some());
            assert!(b.payout.is_some());
        }
        let loser = outcome
            .settled_bets
            .iter()
            .find(|b| b.account_id == "u-2")
            .unwrap();
        assert_eq!(loser.is_winner, Some(false));
        assert_eq!(loser.payout, Some(0));
    }

    #[test]
    fn test_no_winners() {
        let bets = vec![bet("u-1", "7", 10_000)];
        let outcome = compute_outcomes(bets, "8", 80).unwrap();
        assert!(outcome.winners.is_empty());
        assert_eq!(outcome.total_payout, 0);
    }

    #[test]
    fn test_multiple_winners_sum() {
        let bets = vec![bet("u-1", "7", 10_000), bet("u-2", "7", 20_000)];
        let outcome = compute_outcomes(bets, "7", 80).unwrap();
        assert_eq!(outcome.winners.len(), 2);
        assert_eq!(outcome.total_payout, 30_000 * 80);
    }

    #[test]
    fn test_payout_overflow_guarded() {
        let bets = vec![bet("u-1", "7", u64::MAX / 2)];
        assert!(compute_outcomes(bets, "7", 80).is_err());
    }

    #[test]
    fn test_empty_round_settles_cleanly() {
        let outcome = compute_outcomes(vec![], "7", 80).unwrap();
        assert!(outcome.settled_bets.is_empty());
        assert_eq!(outcome.total_payout, 0);
    }
}
