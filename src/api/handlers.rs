//! Request handlers
//!
//! Thin translation layer: parse the request, call the engine, map the
//! result. All business rules live behind the engine boundary.

use super::{
    errors::ApiError,
    middleware::RequestId,
    models::*,
    monitoring::MetricsRegistry,
};
use crate::engine::GameEngine;
use crate::rounds::RoundStatus;
use crate::settlement::SettlementReport;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub engine: Arc<GameEngine>,
    pub metrics: Arc<MetricsRegistry>,
    pub version: String,
}

fn parse_initial_status(raw: Option<&str>, request_id: &str) -> Result<RoundStatus, ApiError> {
    match raw.unwrap_or("pending") {
        "pending" => Ok(RoundStatus::Pending),
        "active" => Ok(RoundStatus::Active),
        other => Err(ApiError::bad_request(
            request_id.to_string(),
            format!("initial status must be 'pending' or 'active', got '{}'", other),
        )),
    }
}

fn parse_status_filter(raw: &str, request_id: &str) -> Result<RoundStatus, ApiError> {
    match raw {
        "pending" => Ok(RoundStatus::Pending),
        "active" => Ok(RoundStatus::Active),
        "completed" => Ok(RoundStatus::Completed),
        "cancelled" => Ok(RoundStatus::Cancelled),
        other => Err(ApiError::bad_request(
            request_id.to_string(),
            format!("unknown round status '{}'", other),
        )),
    }
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
    })
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics.to_prometheus_format()
}

/// POST /accounts
pub async fn create_account_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .engine
        .create_account(&req.account_id, req.opening_balance)
        .await
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;
    Ok(Json(account.into()))
}

/// GET /accounts/:id/balance
pub async fn balance_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let balance = state
        .engine
        .get_balance(&account_id)
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;
    Ok(Json(AccountResponse {
        account_id,
        balance,
    }))
}

/// POST /accounts/:id/deposit
pub async fn deposit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let balance = state
        .engine
        .deposit(&account_id, req.amount)
        .await
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;
    Ok(Json(AccountResponse {
        account_id,
        balance,
    }))
}

/// POST /rounds
pub async fn create_round_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoundRequest>,
) -> Result<Json<RoundResponse>, ApiError> {
    let status = parse_initial_status(req.status.as_deref(), &request_id.0)?;
    let start_time_ms = req.start_time_ms.unwrap_or_else(|| Utc::now().timestamp_millis());

    let round = state
        .engine
        .create_round(&req.admin_id, start_time_ms, status)
        .await
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;

    MetricsRegistry::inc(&state.metrics.rounds_created_total);
    Ok(Json(round.into()))
}

/// POST /rounds/:id/activate
pub async fn activate_round_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    Json(req): Json<AdminActionRequest>,
) -> Result<Json<RoundResponse>, ApiError> {
    let round = state
        .engine
        .activate_round(&req.admin_id, &round_id)
        .await
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;
    Ok(Json(round.into()))
}

/// POST /rounds/:id/winner
pub async fn declare_winner_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    Json(req): Json<DeclareWinnerRequest>,
) -> Result<Json<SettlementReport>, ApiError> {
    let report = state
        .engine
        .declare_winner(&req.admin_id, &round_id, &req.winning_number)
        .await
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;

    MetricsRegistry::inc(&state.metrics.rounds_settled_total);
    MetricsRegistry::add(&state.metrics.payouts_credited_total, report.total_payout);
    Ok(Json(report))
}

/// POST /rounds/:id/cancel
pub async fn cancel_round_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
    Json(req): Json<AdminActionRequest>,
) -> Result<Json<RoundResponse>, ApiError> {
    let round = state
        .engine
        .cancel_round(&req.admin_id, &round_id)
        .await
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;

    MetricsRegistry::inc(&state.metrics.rounds_cancelled_total);
    Ok(Json(round.into()))
}

/// GET /rounds/:id
pub async fn get_round_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
) -> Result<Json<RoundResponse>, ApiError> {
    let round = state
        .engine
        .get_round(&round_id)
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;
    Ok(Json(round.into()))
}

/// GET /rounds?status=&limit=
pub async fn list_rounds_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListRoundsQuery>,
) -> Result<Json<RoundsResponse>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(|s| parse_status_filter(s, &request_id.0))
        .transpose()?;
    let limit = params.limit.min(200);

    let rounds = state
        .engine
        .list_rounds(status, limit)
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;
    Ok(Json(RoundsResponse {
        rounds: rounds.into_iter().map(Into::into).collect(),
    }))
}

/// POST /bets
pub async fn place_bet_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceBetRequest>,
) -> Result<Json<BetResponse>, ApiError> {
    let bet = state
        .engine
        .place_bet(&req.account_id, &req.round_id, &req.selected_number, req.amount)
        .await
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;

    MetricsRegistry::inc(&state.metrics.bets_placed_total);
    MetricsRegistry::add(&state.metrics.amount_wagered_total, bet.amount);
    Ok(Json(bet.into()))
}

/// GET /rounds/:id/bets
pub async fn round_bets_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
) -> Result<Json<BetsResponse>, ApiError> {
    let bets = state
        .engine
        .get_bets_for_round(&round_id)
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;
    Ok(Json(BetsResponse {
        bets: bets.into_iter().map(Into::into).collect(),
    }))
}

/// GET /accounts/:id/bets?round=
pub async fn user_bets_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
    Query(params): Query<UserBetsQuery>,
) -> Result<Json<BetsResponse>, ApiError> {
    let bets = state
        .engine
        .get_user_bets(&account_id, params.round.as_deref())
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;
    Ok(Json(BetsResponse {
        bets: bets.into_iter().map(Into::into).collect(),
    }))
}

/// POST /rewards/redeem
pub async fn redeem_reward_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let amount = state
        .engine
        .redeem_reward(&req.account_id, &req.code)
        .await
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;

    MetricsRegistry::inc(&state.metrics.rewards_redeemed_total);
    Ok(Json(RedeemResponse { amount }))
}

/// GET /rewards/:code/status?account=
pub async fn reward_status_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(params): Query<RewardStatusQuery>,
) -> Result<Json<RewardStatusResponse>, ApiError> {
    let status = state
        .engine
        .get_reward_status(&code, &params.account)
        .map_err(|e| ApiError::from_core(request_id.0.clone(), e))?;
    Ok(Json(status.into()))
}
