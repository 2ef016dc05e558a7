//! Accrual order upload and listing

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use shared::AppError;

use crate::auth::CurrentUser;
use crate::ledger::Registration;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/user/orders", post(upload).get(list))
}

/// Body is the bare order number as text
async fn upload(
    State(state): State<AppState>,
    user: CurrentUser,
    body: String,
) -> Result<StatusCode, AppError> {
    let number = body.trim();
    if number.is_empty() {
        return Err(AppError::invalid_request("Order number is required"));
    }

    match state.ledger.register_order(&user.login, number).await? {
        Registration::Accepted => Ok(StatusCode::ACCEPTED),
        Registration::AlreadyOwnedByCaller => Ok(StatusCode::OK),
    }
}

async fn list(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    let orders = state.ledger.list_orders(&user.login).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(orders).into_response())
}
