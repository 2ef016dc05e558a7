//! Server configuration
//!
//! The five connection settings come from command-line flags or their
//! environment variables (flag first); tuning knobs are environment-only.
//! A `.env` file is loaded before either is read.

use std::time::Duration;

use clap::Parser;

use crate::accrual::ReconcilerSettings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Command-line flags
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "loyalty-server", version, about = "Loyalty points service")]
pub struct Args {
    /// HTTP listen address, `:8080` shorthand accepted
    #[arg(short = 'a', long, env = "RUN_ADDRESS")]
    pub run_address: Option<String>,

    /// SQLite database path or `sqlite:` URL
    #[arg(short = 'd', long, env = "DATABASE_URI")]
    pub database_uri: Option<String>,

    /// Accrual service base URL
    #[arg(short = 'r', long = "accrual-system-address", env = "ACCRUAL_SYSTEM_ADDRESS")]
    pub accrual_address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Token signing secret
    #[arg(short = 'k', long, env = "SECRET_TOKEN", hide_env_values = true)]
    pub secret_token: Option<String>,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address (-a / RUN_ADDRESS)
    pub run_address: String,
    /// SQLite path or `sqlite:` URL (-d / DATABASE_URI)
    pub database_uri: String,
    /// Accrual service base URL (-r / ACCRUAL_SYSTEM_ADDRESS)
    pub accrual_address: String,
    /// Default tracing level (-l / LOG_LEVEL)
    pub log_level: String,
    /// Emit JSON log lines (env: LOG_FORMAT=json)
    pub log_json: bool,
    /// Optional directory for daily log files
    pub log_dir: Option<String>,
    /// Token signing secret; random per process when unset (-k / SECRET_TOKEN)
    pub secret_token: Option<String>,
    pub token_ttl_minutes: i64,
    pub accrual_timeout: Duration,
    pub reconciler: ReconcilerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_address: "0.0.0.0:8080".into(),
            database_uri: "gophermart.db".into(),
            accrual_address: "http://localhost:8081".into(),
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            secret_token: None,
            token_ttl_minutes: 1440,
            accrual_timeout: Duration::from_millis(5000),
            reconciler: ReconcilerSettings::default(),
        }
    }
}

impl Config {
    /// Parse the process arguments and environment
    pub fn load() -> Result<Self, BoxError> {
        Self::from_sources(Args::parse(), |name| std::env::var(name).ok())
    }

    /// Build from parsed flags plus `lookup` for the environment-only
    /// settings; empty values count as unset
    pub fn from_sources(
        args: Args,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, BoxError> {
        let var = |name: &str| non_empty(lookup(name));
        let defaults = Self::default();

        let millis = |name: &str, default: Duration| -> Result<Duration, BoxError> {
            Ok(match var(name) {
                Some(v) => Duration::from_millis(parse(name, &v)?),
                None => default,
            })
        };

        let reconciler = ReconcilerSettings {
            interval: millis("RECONCILE_INTERVAL_MS", defaults.reconciler.interval)?,
            batch_size: match var("RECONCILE_BATCH_SIZE") {
                Some(v) => parse("RECONCILE_BATCH_SIZE", &v)?,
                None => defaults.reconciler.batch_size,
            },
            retry_interval: millis("RECONCILE_RETRY_MS", defaults.reconciler.retry_interval)?,
            rate_limit_backoff: millis(
                "RECONCILE_RATE_LIMIT_MS",
                defaults.reconciler.rate_limit_backoff,
            )?,
            max_attempts: match var("RECONCILE_MAX_ATTEMPTS") {
                Some(v) => parse("RECONCILE_MAX_ATTEMPTS", &v)?,
                None => defaults.reconciler.max_attempts,
            },
        };
        if reconciler.interval.is_zero() {
            return Err("RECONCILE_INTERVAL_MS must be greater than zero".into());
        }
        if reconciler.batch_size == 0 {
            return Err("RECONCILE_BATCH_SIZE must be greater than zero".into());
        }

        let log_json = match var("LOG_FORMAT").as_deref() {
            None | Some("text") => false,
            Some("json") => true,
            Some(other) => return Err(format!("LOG_FORMAT must be text or json, got {other}").into()),
        };

        Ok(Self {
            run_address: non_empty(args.run_address)
                .map(|addr| normalize_address(&addr))
                .unwrap_or(defaults.run_address),
            database_uri: non_empty(args.database_uri).unwrap_or(defaults.database_uri),
            accrual_address: non_empty(args.accrual_address)
                .map(|addr| normalize_url(&addr))
                .unwrap_or(defaults.accrual_address),
            log_level: non_empty(args.log_level).unwrap_or(defaults.log_level),
            log_json,
            log_dir: var("LOG_DIR"),
            secret_token: non_empty(args.secret_token),
            token_ttl_minutes: match var("TOKEN_TTL_MINUTES") {
                Some(v) => parse("TOKEN_TTL_MINUTES", &v)?,
                None => defaults.token_ttl_minutes,
            },
            accrual_timeout: millis("ACCRUAL_TIMEOUT_MS", defaults.accrual_timeout)?,
            reconciler,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, BoxError> {
    value
        .parse()
        .map_err(|_| format!("{name} has an invalid value: {value:?}").into())
}

/// `:8080` → `0.0.0.0:8080`
fn normalize_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

/// Bare `host:port` → `http://host:port`, trailing slash removed
fn normalize_url(addr: &str) -> String {
    let addr = addr.trim_end_matches('/');
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    }
}
