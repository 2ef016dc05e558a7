//! Loyalty points backend
//!
//! Users upload purchase order numbers, an external accrual service decides
//! how many points each order earns, and users spend points against new
//! order numbers.
//!
//! ```text
//! loyalty-server/src/
//! ├── db/         # SQLite pool, migrations, table queries
//! ├── ledger/     # Luhn check, order registrar, balance ledger, accounts
//! ├── accrual/    # accrual client + reconciliation loop
//! ├── auth/       # JWT, extractor, password hashing
//! ├── api/        # HTTP routes
//! ├── config.rs   # environment configuration
//! ├── error.rs    # ledger outcome → AppError mapping
//! ├── logger.rs   # tracing setup
//! ├── server.rs   # lifecycle
//! └── state.rs    # handler state
//! ```

pub mod accrual;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod server;
pub mod state;

pub use config::Config;
pub use ledger::{Ledger, LedgerError};
pub use server::Server;
pub use state::AppState;
