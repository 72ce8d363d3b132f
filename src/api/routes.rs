//! Route definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Service endpoints
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        // Accounts
        .route("/accounts", post(create_account_handler))
        .route("/accounts/:id/balance", get(balance_handler))
        .route("/accounts/:id/deposit", post(deposit_handler))
        .route("/accounts/:id/bets", get(user_bets_handler))
        // Round lifecycle
        .route("/rounds", post(create_round_handler).get(list_rounds_handler))
        .route("/rounds/:id", get(get_round_handler))
        .route("/rounds/:id/activate", post(activate_round_handler))
        .route("/rounds/:id/winner", post(declare_winner_handler))
        .route("/rounds/:id/cancel", post(cancel_round_handler))
        .route("/rounds/:id/bets", get(round_bets_handler))
        // Wagering
        .route("/bets", post(place_bet_handler))
        // Rewards
        .route("/rewards/redeem", post(redeem_reward_handler))
        .route("/rewards/:code/status", get(reward_status_handler))
        // Attach shared state
        .with_state(state)
}
