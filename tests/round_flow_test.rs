//! End-to-end round lifecycle tests against a real RocksDB directory.
//! These exercise the public engine API the same way the HTTP handlers do.

use std::sync::Arc;

use numpool::config::GameConfig;
use numpool::rounds::RoundStatus;
use numpool::storage::Store;
use numpool::{CoreError, GameEngine};
use tempfile::TempDir;

const STAKE: u64 = 10_000;

fn test_config() -> GameConfig {
    GameConfig {
        min_stake: STAKE,
        payout_multiplier: 80,
        reward_expiry_hours: 72,
        admin_accounts: vec!["admin-1".to_string()],
    }
}

fn spawn_engine() -> (TempDir, Arc<GameEngine>) {
    let dir = TempDir::new().expect("tempdir");
    let store = Store::open(dir.path()).expect("open store");
    (dir, Arc::new(GameEngine::new(store, test_config())))
}

#[tokio::test]
async fn full_round_flow_with_reward_redemption() {
    let (_dir, engine) = spawn_engine();

    engine.create_account("alice", 100_000).await.unwrap();
    engine.create_account("bob", 5_000).await.unwrap();

    let round = engine
        .create_round("admin-1", 0, RoundStatus::Active)
        .await
        .unwrap();

    // Alice stakes 10k on 7, fully debited up front.
    let bet = engine
        .place_bet("alice", &round.id, "7", STAKE)
        .await
        .unwrap();
    assert_eq!(engine.get_balance("alice").unwrap(), 90_000);
    assert_eq!(engine.get_round(&round.id).unwrap().pool_total, STAKE);

    // Bob cannot cover the stake; the failure leaves no trace anywhere.
    let err = engine
        .place_bet("bob", &round.id, "7", STAKE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::InsufficientFunds {
            balance: 5_000,
            required: 10_000
        }
    ));
    assert_eq!(engine.get_balance("bob").unwrap(), 5_000);
    assert!(engine.get_user_bets("bob", None).unwrap().is_empty());
    assert_eq!(engine.get_round(&round.id).unwrap().pool_total, STAKE);

    // Settlement pays 80x and issues one reward code per winning bet.
    let report = engine.declare_winner("admin-1", &round.id, "7").await.unwrap();
    assert_eq!(report.winner_count, 1);
    assert_eq!(report.total_payout, 800_000);
    assert_eq!(report.rewards.len(), 1);
    assert_eq!(report.rewards[0].account_id, "alice");
    assert_eq!(report.rewards[0].amount, 800_000);

    let settled = engine.get_round(&round.id).unwrap();
    assert_eq!(settled.status, RoundStatus::Completed);
    assert_eq!(settled.winning_number.as_deref(), Some("7"));
    assert_eq!(settled.total_payout, 800_000);

    let bets = engine.get_bets_for_round(&round.id).unwrap();
    assert_eq!(bets.len(), 1);
    assert_eq!(bets[0].id, bet.id);
    assert_eq!(bets[0].is_winner, Some(true));
    assert_eq!(bets[0].payout, Some(800_000));

    // Payout is credited immediately; the code is a separate bonus grant.
    assert_eq!(engine.get_balance("alice").unwrap(), 890_000);

    let code = &report.rewards[0].code;
    let status = engine.get_reward_status(code, "alice").unwrap();
    assert!(status.is_available);
    assert!(!status.is_used);

    let amount = engine.redeem_reward("alice", code).await.unwrap();
    assert_eq!(amount, 800_000);
    assert_eq!(engine.get_balance("alice").unwrap(), 1_690_000);

    let err = engine.redeem_reward("alice", code).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyRedeemed));
    assert_eq!(engine.get_balance("alice").unwrap(), 1_690_000);

    let status = engine.get_reward_status(code, "alice").unwrap();
    assert!(status.is_used);
    assert!(!status.is_available);
}

#[tokio::test]
async fn cancelled_round_refunds_every_stake() {
    let (_dir, engine) = spawn_engine();

    engine.create_account("p1", 50_000).await.unwrap();
    engine.create_account("p2", 50_000).await.unwrap();

    let round = engine
        .create_round("admin-1", 0, RoundStatus::Active)
        .await
        .unwrap();
    engine.place_bet("p1", &round.id, "12", STAKE).await.unwrap();
    engine.place_bet("p1", &round.id, "34", STAKE).await.unwrap();
    engine.place_bet("p2", &round.id, "12", STAKE).await.unwrap();
    assert_eq!(engine.get_balance("p1").unwrap(), 30_000);
    assert_eq!(engine.get_balance("p2").unwrap(), 40_000);

    let cancelled = engine.cancel_round("admin-1", &round.id).await.unwrap();
    assert_eq!(cancelled.status, RoundStatus::Cancelled);
    assert_eq!(engine.get_balance("p1").unwrap(), 50_000);
    assert_eq!(engine.get_balance("p2").unwrap(), 50_000);

    // Terminal rounds reject further wagers and a second cancel.
    let err = engine
        .place_bet("p1", &round.id, "5", STAKE)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::RoundNotActive(_)));
    let err = engine.cancel_round("admin-1", &round.id).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));
}

#[tokio::test]
async fn funds_are_conserved_across_placement_and_settlement() {
    let (_dir, engine) = spawn_engine();

    let opening = 200_000u64;
    let players = ["c1", "c2", "c3", "c4"];
    for id in players {
        engine.create_account(id, opening).await.unwrap();
    }
    let initial_total = opening * players.len() as u64;

    let round = engine
        .create_round("admin-1", 0, RoundStatus::Active)
        .await
        .unwrap();

    let numbers = ["7", "7", "13", "42", "7", "99", "13", "42"];
    let mut placed = 0u64;
    for (i, number) in numbers.iter().enumerate() {
        let account = players[i % players.len()];
        let amount = STAKE + (i as u64 * 1_000);
        engine
            .place_bet(account, &round.id, number, amount)
            .await
            .unwrap();
        placed += amount;
    }

    // Every staked unit moved out of a balance and into the pool.
    let balances: u64 = players
        .iter()
        .map(|id| engine.get_balance(id).unwrap())
        .sum();
    assert_eq!(balances + placed, initial_total);
    assert_eq!(engine.get_round(&round.id).unwrap().pool_total, placed);

    let report = engine.declare_winner("admin-1", &round.id, "7").await.unwrap();
    assert_eq!(report.winner_count, 3);
    assert_eq!(report.pool_total, placed);

    let winning_stakes: u64 = engine
        .get_bets_for_round(&round.id)
        .unwrap()
        .iter()
        .filter(|b| b.is_winner == Some(true))
        .map(|b| b.amount)
        .sum();
    assert_eq!(report.total_payout, winning_stakes * 80);

    // Redeem every issued code, then the only delta from the opening total
    // is the stakes paid in versus payouts and rewards paid out.
    for reward in &report.rewards {
        engine.redeem_reward(&reward.account_id, &reward.code).await.unwrap();
    }
    let final_total: u64 = players
        .iter()
        .map(|id| engine.get_balance(id).unwrap())
        .sum();
    assert_eq!(
        final_total,
        initial_total - placed + report.total_payout * 2
    );
}

#[tokio::test]
async fn concurrent_bets_never_overdraw_an_account() {
    let (_dir, engine) = spawn_engine();

    // Funds for exactly 5 stakes, 20 racing attempts.
    engine.create_account("racer", STAKE * 5).await.unwrap();
    let round = engine
        .create_round("admin-1", 0, RoundStatus::Active)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let engine = Arc::clone(&engine);
        let round_id = round.id.clone();
        tasks.push(tokio::spawn(async move {
            engine
                .place_bet("racer", &round_id, &format!("{}", i), STAKE)
                .await
        }));
    }

    let mut successes = 0u64;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(CoreError::InsufficientFunds { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 5);
    assert_eq!(engine.get_balance("racer").unwrap(), 0);
    assert_eq!(engine.get_user_bets("racer", None).unwrap().len(), 5);
    assert_eq!(engine.get_round(&round.id).unwrap().pool_total, STAKE * 5);
}

#[tokio::test]
async fn a_round_settles_at_most_once() {
    let (_dir, engine) = spawn_engine();

    engine.create_account("alice", 100_000).await.unwrap();
    let round = engine
        .create_round("admin-1", 0, RoundStatus::Active)
        .await
        .unwrap();
    engine.place_bet("alice", &round.id, "7", STAKE).await.unwrap();

    engine.declare_winner("admin-1", &round.id, "7").await.unwrap();
    let balance_after_first = engine.get_balance("alice").unwrap();

    let err = engine
        .declare_winner("admin-1", &round.id, "7")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));
    assert_eq!(engine.get_balance("alice").unwrap(), balance_after_first);
}

#[tokio::test]
async fn concurrent_redemption_credits_exactly_once() {
    let (_dir, engine) = spawn_engine();

    engine.create_account("alice", 100_000).await.unwrap();
    let round = engine
        .create_round("admin-1", 0, RoundStatus::Active)
        .await
        .unwrap();
    engine.place_bet("alice", &round.id, "7", STAKE).await.unwrap();
    let report = engine.declare_winner("admin-1", &round.id, "7").await.unwrap();
    let code = report.rewards[0].code.clone();
    let before = engine.get_balance("alice").unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let code = code.clone();
        tasks.push(tokio::spawn(
            async move { engine.redeem_reward("alice", &code).await },
        ));
    }

    let mut successes = 0u64;
    for task in tasks {
        match task.await.unwrap() {
            Ok(amount) => {
                assert_eq!(amount, report.rewards[0].amount);
                successes += 1;
            }
            Err(CoreError::AlreadyRedeemed) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(
        engine.get_balance("alice").unwrap(),
        before + report.rewards[0].amount
    );
}

#[tokio::test]
async fn state_survives_a_store_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let round_id;
    let code;
    {
        let store = Store::open(dir.path()).expect("open store");
        let engine = GameEngine::new(store, test_config());
        engine.create_account("alice", 100_000).await.unwrap();
        let round = engine
            .create_round("admin-1", 0, RoundStatus::Active)
            .await
            .unwrap();
        engine.place_bet("alice", &round.id, "7", STAKE).await.unwrap();
        let report = engine.declare_winner("admin-1", &round.id, "7").await.unwrap();
        round_id = round.id;
        code = report.rewards[0].code.clone();
    }

    let store = Store::open(dir.path()).expect("reopen store");
    let engine = GameEngine::new(store, test_config());

    assert_eq!(engine.get_balance("alice").unwrap(), 890_000);
    let round = engine.get_round(&round_id).unwrap();
    assert_eq!(round.status, RoundStatus::Completed);
    assert_eq!(round.winning_number.as_deref(), Some("7"));

    let amount = engine.redeem_reward("alice", &code).await.unwrap();
    assert_eq!(amount, 800_000);
}
