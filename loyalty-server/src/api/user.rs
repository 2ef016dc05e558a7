//! Registration and login
//!
//! Both answer 200 with the token in `Authorization` and in the auth cookie.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use shared::AppError;
use shared::models::Credentials;

use crate::auth::AUTH_COOKIE;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/user/register", post(register))
        .route("/api/user/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap), AppError> {
    let Json(creds) = body.map_err(bad_body)?;
    state.ledger.register_user(&creds.login, &creds.password).await?;
    issue_token(&state, &creds.login)
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap), AppError> {
    let Json(creds) = body.map_err(bad_body)?;
    state.ledger.authenticate(&creds.login, &creds.password).await?;
    tracing::info!(login = %creds.login, "User logged in");
    issue_token(&state, &creds.login)
}

pub(crate) fn bad_body(rejection: JsonRejection) -> AppError {
    AppError::invalid_request(rejection.body_text())
}

fn issue_token(state: &AppState, login: &str) -> Result<(StatusCode, HeaderMap), AppError> {
    let token = state.jwt.generate_token(login)?;
    let max_age = state.jwt.config.expiration_minutes * 60;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| AppError::internal(e.to_string()))?,
    );
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&format!(
            "{AUTH_COOKIE}={token}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax"
        ))
        .map_err(|e| AppError::internal(e.to_string()))?,
    );
    Ok((StatusCode::OK, headers))
}
