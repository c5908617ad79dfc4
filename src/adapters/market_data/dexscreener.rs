//! Dexscreener Adapter
//!
//! Fetches token pairs from the public Dexscreener API and normalizes the
//! deepest pair on the requested chain into a `MarketSnapshot`.
//!
//! Dexscreener does not report a 24h high/low, so the range is bounded by
//! the current price and the price implied by the 24h change.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::{
    LiquidityInfo, MarketSnapshot, PriceInfo, ProviderId, SnapshotMetadata, TokenRef, VolumeInfo,
};
use crate::ports::{AdapterError, AdapterResponse, ProviderAdapter, SnapshotParams};

pub const DEXSCREENER_API: &str = "https://api.dexscreener.com/latest/dex/tokens";

/// Confidence reported for Dexscreener snapshots (range is approximated)
const DEXSCREENER_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct DexscreenerAdapter {
    http: Client,
    base_url: String,
}

impl DexscreenerAdapter {
    pub fn new() -> Result<Self, AdapterError> {
        Self::with_base_url(DEXSCREENER_API, Duration::from_secs(10))
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AdapterError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn normalize(
        &self,
        params: &SnapshotParams,
        response: TokensResponse,
    ) -> Result<MarketSnapshot, AdapterError> {
        let pair = response
            .pairs
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.chain_id.eq_ignore_ascii_case(&params.chain))
            .filter(|p| same_address(&params.chain, &p.base_token.address, &params.address))
            .max_by(|a, b| a.liquidity_usd().total_cmp(&b.liquidity_usd()))
            .ok_or_else(|| AdapterError::NotFound(params.address.clone()))?;

        let current: f64 = pair
            .price_usd
            .as_deref()
            .ok_or_else(|| AdapterError::Parse("missing priceUsd".to_string()))?
            .parse()
            .map_err(|e| AdapterError::Parse(format!("priceUsd: {}", e)))?;

        let total = pair.liquidity_usd();
        let change_24h = pair.price_change.as_ref().and_then(|c| c.h24).unwrap_or(0.0);
        let open = if change_24h > -100.0 {
            current / (1.0 + change_24h / 100.0)
        } else {
            current
        };

        Ok(MarketSnapshot {
            token: TokenRef {
                address: pair.base_token.address,
                symbol: params.symbol.clone().unwrap_or(pair.base_token.symbol),
                chain: params.chain.clone(),
                decimals: params.decimals,
            },
            price: PriceInfo {
                current,
                high_24h: current.max(open),
                low_24h: current.min(open),
                change_24h,
            },
            volume: VolumeInfo {
                volume_24h: pair.volume.as_ref().and_then(|v| v.h24).unwrap_or(0.0),
            },
            liquidity: LiquidityInfo {
                total,
            },
            metadata: SnapshotMetadata {
                provider: "dexscreener".to_string(),
                timestamp: Utc::now(),
                cached: false,
                confidence: DEXSCREENER_CONFIDENCE,
            },
        })
    }
}

/// Hex EVM addresses compare case-insensitively; base58 mints are case-sensitive
fn same_address(chain: &str, reported: &str, requested: &str) -> bool {
    let evm = !chain.eq_ignore_ascii_case("solana")
        && reported.starts_with("0x")
        && requested.starts_with("0x");
    if evm {
        reported.eq_ignore_ascii_case(requested)
    } else {
        reported == requested
    }
}

#[async_trait]
impl ProviderAdapter for DexscreenerAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::from("dexscreener")
    }

    async fn fetch_snapshot(
        &self,
        params: &SnapshotParams,
    ) -> Result<AdapterResponse<MarketSnapshot>, AdapterError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), params.address);
        let response = self.http.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                return Ok(AdapterResponse::failed("rate limited (429)"));
            }
            status => {
                return Ok(AdapterResponse::failed(format!("HTTP status {}", status)));
            }
        }

        let body: TokensResponse = response.json().await?;
        Ok(AdapterResponse::ok(self.normalize(params, body)?))
    }
}

#[derive(Debug, Deserialize)]
struct TokensResponse {
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pair {
    chain_id: String,
    base_token: BaseToken,
    price_usd: Option<String>,
    price_change: Option<Window>,
    volume: Option<Window>,
    liquidity: Option<Liquidity>,
}

impl Pair {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
struct BaseToken {
    address: String,
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct Window {
    h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Liquidity {
    usd: Option<f64>,
}
