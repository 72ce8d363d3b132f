//! numpool - numbers-betting round, ledger and settlement service
//!
//! Administrators open a round, players wager on a chosen number against a
//! shared pool, and settlement pays winners a fixed multiple of their stake
//! plus a redeemable reward code. The crate's core protects the money
//! invariants: balances never go negative, a bet is debited and recorded
//! atomically, a round settles exactly once, a reward code redeems at most
//! once.

pub mod api;
pub mod audit;
pub mod bets;
pub mod config;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod rewards;
pub mod rounds;
pub mod settlement;
pub mod storage;

pub use engine::GameEngine;
pub use errors::{CoreError, CoreResult};
