//! HTTP client for the accrual service
//!
//! `GET {base}/api/orders/{number}`, one request per [`AccrualSource::poll`]
//! call. Retrying is the reconciler's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{AccrualError, AccrualSource, AccrualStatus, AccrualVerdict, PollOutcome};
use crate::ledger::money;

/// Body of a 200 answer
#[derive(Debug, Deserialize)]
struct AccrualResponse {
    #[allow(dead_code)]
    order: String,
    status: AccrualStatus,
    #[serde(default)]
    accrual: Option<Decimal>,
}

/// reqwest-backed [`AccrualSource`]
#[derive(Clone)]
pub struct AccrualClient {
    client: Client,
    base_url: String,
}

impl AccrualClient {
    /// Build a client for the service at `base_url` (scheme + host, no path)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AccrualError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn order_url(&self, number: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, number)
    }
}

#[async_trait]
impl AccrualSource for AccrualClient {
    async fn poll(&self, number: &str) -> Result<PollOutcome, AccrualError> {
        let response = self.client.get(self.order_url(number)).send().await?;
        let status = response.status();

        match status {
            StatusCode::OK => {
                let body = response.bytes().await?;
                let parsed: AccrualResponse = serde_json::from_slice(&body)
                    .map_err(|e| AccrualError::Decode(e.to_string()))?;
                Ok(outcome_from_body(parsed))
            }
            StatusCode::NO_CONTENT => Ok(PollOutcome::Unknown),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after);
                Ok(PollOutcome::RateLimited(retry_after))
            }
            s if s.is_server_error() => Err(AccrualError::ServerError(s.as_u16())),
            s => Err(AccrualError::UnexpectedStatus(s.as_u16())),
        }
    }
}

fn outcome_from_body(body: AccrualResponse) -> PollOutcome {
    match body.status {
        AccrualStatus::Processed => {
            let amount = money::round_points(body.accrual.unwrap_or_default());
            PollOutcome::Resolved(AccrualVerdict::Processed(amount))
        }
        AccrualStatus::Invalid => PollOutcome::Resolved(AccrualVerdict::Invalid),
        pending => PollOutcome::Pending(pending),
    }
}

/// Delay-seconds form only
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
