//! Balance, withdrawals

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use shared::{AppError, Balance, WithdrawRequest};

use super::user::bad_body;
use crate::auth::CurrentUser;
use crate::ledger::{DebitOutcome, WithdrawalHistory};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/user/balance", get(balance))
        .route("/api/user/balance/withdraw", post(withdraw))
        .route("/api/user/withdrawals", get(withdrawals))
}

async fn balance(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Balance>, AppError> {
    Ok(Json(state.ledger.balance(&user.login).await?))
}

async fn withdraw(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(req) = body.map_err(bad_body)?;
    match state
        .ledger
        .debit(&user.login, req.order.trim(), req.sum)
        .await?
    {
        // A repeat by the same owner is an idempotent no-op
        DebitOutcome::Withdrawn | DebitOutcome::AlreadyOwnedByCaller => Ok(StatusCode::OK),
    }
}

async fn withdrawals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    match state.ledger.withdrawal_history(&user.login).await? {
        WithdrawalHistory::Empty => Ok(StatusCode::NO_CONTENT.into_response()),
        WithdrawalHistory::Entries(entries) => Ok(Json(entries).into_response()),
    }
}
