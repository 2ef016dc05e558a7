//! User accounts

use shared::util::now_millis;

use super::{Ledger, LedgerError};
use crate::auth::password;
use crate::db::{self, users};

const MAX_LOGIN_LEN: usize = 128;

impl Ledger {
    /// Create a user with a zero balance
    pub async fn register_user(&self, login: &str, password: &str) -> Result<(), LedgerError> {
        validate_credentials(login, password)?;

        let hash = password::hash_password(password)
            .map_err(|e| LedgerError::PasswordHash(e.to_string()))?;

        match users::insert(&self.pool, login, &hash, now_millis()).await {
            Ok(()) => {
                tracing::info!(login = %login, "User registered");
                Ok(())
            }
            Err(e) if db::is_unique_violation(&e) => Err(LedgerError::LoginTaken(login.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Check a login/password pair
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<(), LedgerError> {
        let user = users::find_by_login(&self.pool, login)
            .await?
            .ok_or(LedgerError::InvalidCredentials)?;

        if !password::verify_password(password, &user.password_hash) {
            tracing::warn!(login = %login, "Login failed");
            return Err(LedgerError::InvalidCredentials);
        }
        Ok(())
    }
}

fn validate_credentials(login: &str, password: &str) -> Result<(), LedgerError> {
    if login.trim().is_empty() || password.is_empty() {
        return Err(LedgerError::Validation("login and password are required".into()));
    }
    if login.len() > MAX_LOGIN_LEN {
        return Err(LedgerError::Validation(format!(
            "login must be at most {MAX_LOGIN_LEN} bytes"
        )));
    }
    Ok(())
}
