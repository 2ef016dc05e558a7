//! HTTP API
//!
//! Thin handlers over the ledger; every failure becomes an
//! [`AppError`](shared::AppError) and is rendered by its `IntoResponse`.

pub mod balance;
pub mod health;
pub mod orders;
pub mod user;

use axum::Router;
use http::{HeaderName, HeaderValue};
use rand::Rng;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Random 16-hex-digit request id
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = format!("{:016x}", rand::thread_rng().r#gen::<u64>());
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// All routes, no middleware
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(user::router())
        .merge(orders::router())
        .merge(balance::router())
        .merge(health::router())
}

/// Routes plus middleware and state
pub fn build_app(state: AppState) -> Router {
    build_router()
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .with_state(state)
}
