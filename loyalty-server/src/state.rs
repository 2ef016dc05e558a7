//! Shared application state

use std::sync::Arc;

use crate::auth::JwtService;
use crate::config::Config;
use crate::ledger::Ledger;

/// Handed to every request handler
///
/// Holds no mutable state of its own; consistency lives in the database.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub jwt: Arc<JwtService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(ledger: Ledger, jwt: JwtService, config: Config) -> Self {
        Self {
            ledger,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}
