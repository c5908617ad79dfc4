//! Signal Detector
//!
//! Combines a snapshot, an external heuristics read and the detected regime
//! into one scored signal. Detection is total: any input yields a signal,
//! low-conviction reads simply come out as `no_edge` with low confidence.

use chrono::Utc;

use crate::domain::{
    Bias, Direction, Heuristics, LiquidityTier, MarketRegime, MarketSnapshot, Signal,
    SignalFeatures, Trend, Volatility,
};

/// Bias agrees with the trend
const ALIGNED_BONUS: f64 = 0.10;
/// Bias fights the trend
const COUNTER_TREND_PENALTY: f64 = 0.15;
/// Trend move is stretched (overbought into strength, oversold into weakness)
const EXHAUSTION_PENALTY: f64 = 0.10;
const LOW_LIQUIDITY_PENALTY: f64 = 0.20;
const HIGH_VOL_PENALTY: f64 = 0.05;

pub mod patterns {
    pub const TREND_CONTINUATION_LONG: &str = "trend_continuation_long";
    pub const TREND_CONTINUATION_SHORT: &str = "trend_continuation_short";
    pub const TREND_EXHAUSTION: &str = "trend_exhaustion";
    pub const CAPITULATION_WATCH: &str = "capitulation_watch";
    pub const RANGE_REVERSAL_LONG: &str = "range_reversal_long";
    pub const RANGE_REVERSAL_SHORT: &str = "range_reversal_short";
    pub const COUNTER_TREND_LONG: &str = "counter_trend_long";
    pub const COUNTER_TREND_SHORT: &str = "counter_trend_short";
    pub const VOLATILITY_EXPANSION: &str = "volatility_expansion";
    pub const NO_EDGE: &str = "no_edge";
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalDetector;

impl SignalDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(
        &self,
        snapshot: &MarketSnapshot,
        heuristics: &Heuristics,
        regime: MarketRegime,
    ) -> Signal {
        let (pattern, adjustment) = classify(heuristics, regime);

        let base = if heuristics.confidence.is_finite() {
            heuristics.confidence
        } else {
            0.0
        };
        let mut confidence = base + adjustment;
        if regime.liquidity == LiquidityTier::Low {
            confidence -= LOW_LIQUIDITY_PENALTY;
        }
        if regime.vol == Volatility::High {
            confidence -= HIGH_VOL_PENALTY;
        }
        let confidence = confidence.clamp(0.0, 1.0);

        let direction = Direction::from(heuristics.bias);
        let thesis = compose_thesis(snapshot, heuristics, regime, pattern, confidence);

        tracing::debug!(
            "Signal {} {} {} conf {:.2} ({})",
            snapshot.token.symbol,
            pattern,
            direction,
            confidence,
            regime
        );

        Signal {
            id: Signal::new_id(),
            symbol: snapshot.token.symbol.clone(),
            token_address: snapshot.token.address.clone(),
            chain: snapshot.token.chain.clone(),
            pattern: pattern.to_string(),
            confidence,
            direction,
            thesis,
            regime,
            features: SignalFeatures {
                price: snapshot.price.current,
                change_24h: snapshot.price.change_24h,
                range_ratio: snapshot.range_ratio(),
                liquidity_usd: snapshot.liquidity.total,
                volume_24h: snapshot.volume.volume_24h,
                rsi_overbought: heuristics.rsi_overbought,
                rsi_oversold: heuristics.rsi_oversold,
                entry_zone: heuristics.entry_zone,
                heuristic_source: heuristics.source.clone(),
                provider: snapshot.metadata.provider.clone(),
            },
            rule_id: None,
            created_at: Utc::now(),
            triggered_at: None,
        }
    }
}

/// Pattern label and confidence adjustment for a regime + bias pair
fn classify(h: &Heuristics, regime: MarketRegime) -> (&'static str, f64) {
    use patterns::*;

    match (regime.trend, h.bias) {
        (Trend::Up, Bias::Bullish) if h.rsi_overbought => (TREND_EXHAUSTION, -EXHAUSTION_PENALTY),
        (Trend::Up, Bias::Bullish) => (TREND_CONTINUATION_LONG, ALIGNED_BONUS),
        (Trend::Down, Bias::Bearish) if h.rsi_oversold => (CAPITULATION_WATCH, -EXHAUSTION_PENALTY),
        (Trend::Down, Bias::Bearish) => (TREND_CONTINUATION_SHORT, ALIGNED_BONUS),
        (Trend::Up, Bias::Bearish) => (COUNTER_TREND_SHORT, -COUNTER_TREND_PENALTY),
        (Trend::Down, Bias::Bullish) => (COUNTER_TREND_LONG, -COUNTER_TREND_PENALTY),
        (Trend::Side, Bias::Bullish) => (
            RANGE_REVERSAL_LONG,
            if h.rsi_oversold { ALIGNED_BONUS } else { 0.0 },
        ),
        (Trend::Side, Bias::Bearish) => (
            RANGE_REVERSAL_SHORT,
            if h.rsi_overbought { ALIGNED_BONUS } else { 0.0 },
        ),
        (_, Bias::Neutral) if regime.vol == Volatility::High => (VOLATILITY_EXPANSION, 0.0),
        (_, Bias::Neutral) => (NO_EDGE, 0.0),
    }
}

fn compose_thesis(
    snapshot: &MarketSnapshot,
    h: &Heuristics,
    regime: MarketRegime,
    pattern: &str,
    confidence: f64,
) -> String {
    let trend = match regime.trend {
        Trend::Up => "trending up",
        Trend::Down => "trending down",
        Trend::Side => "ranging",
    };

    let mut thesis = format!(
        "{} is {} ({:+.1}% 24h) with {} volatility and {} liquidity; {} reads {} bias",
        snapshot.token.symbol,
        trend,
        snapshot.price.change_24h,
        regime.vol,
        regime.liquidity,
        h.source,
        h.bias,
    );

    if h.rsi_overbought {
        thesis.push_str(", overbought");
    } else if h.rsi_oversold {
        thesis.push_str(", oversold");
    }

    thesis.push_str(&format!(". Pattern {} at {:.0}% confidence.", pattern, confidence * 100.0));
    if regime.liquidity == LiquidityTier::Low {
        thesis.push_str(" Thin liquidity: size down.");
    }
    thesis
}
