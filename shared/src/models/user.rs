//! User credentials

use serde::{Deserialize, Serialize};

/// Login / registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}
