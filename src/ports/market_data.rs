//! Market data port
//!
//! Contract every provider adapter implements, plus the error taxonomy of
//! the acquisition layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::{MarketSnapshot, ProviderId, SnapshotError};

/// Single-provider failure. Never escapes the fallback loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider reported failure: {0}")]
    Reported(String),

    #[error("Provider returned no data")]
    EmptyPayload,

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] SnapshotError),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Token not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        AdapterError::Http(e.to_string())
    }
}

/// Error body of an adapter response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterErrorBody {
    pub message: String,
}

/// Envelope returned by adapters. `success = false` is treated exactly like
/// a returned `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<AdapterErrorBody>,
}

impl<T> AdapterResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(AdapterErrorBody { message: message.into() }),
        }
    }

    /// Collapse the envelope into a `Result`
    pub fn into_result(self) -> Result<T, AdapterError> {
        if !self.success {
            let message = self
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unspecified provider error".to_string());
            return Err(AdapterError::Reported(message));
        }
        self.data.ok_or(AdapterError::EmptyPayload)
    }
}

/// Token lookup parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotParams {
    pub address: String,
    pub chain: String,
    /// Symbol hint for providers that do not report one
    pub symbol: Option<String>,
    /// Decimals hint for providers that do not report them
    pub decimals: Option<u8>,
}

impl SnapshotParams {
    pub fn new(address: impl Into<String>, chain: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            chain: chain.into(),
            symbol: None,
            decimals: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Cache key built from address and chain
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.chain.to_lowercase(), self.address)
    }
}

/// Per-vendor market data client
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider identifier used for health tracking and ranking
    fn id(&self) -> ProviderId;

    /// Fetch a normalized snapshot for one token
    async fn fetch_snapshot(
        &self,
        params: &SnapshotParams,
    ) -> Result<AdapterResponse<MarketSnapshot>, AdapterError>;
}

/// One failed attempt inside a fallback chain
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub error: AdapterError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// Every provider in the chain failed. The only error that escapes the
/// orchestrator.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "No market data from any provider ({} attempted): {}",
    .causes.len(),
    render_causes(.causes)
)]
pub struct MarketDataUnavailableError {
    /// Failures in the order the providers were tried
    pub causes: Vec<ProviderFailure>,
}

fn render_causes(causes: &[ProviderFailure]) -> String {
    if causes.is_empty() {
        return "no providers configured".to_string();
    }
    causes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
