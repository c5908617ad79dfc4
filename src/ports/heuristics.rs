//! Heuristics port
//!
//! The bias read fed into signal detection is produced outside the core.
//! Sources are pure: same snapshot, same heuristics.

use crate::domain::{Heuristics, MarketSnapshot};

pub trait HeuristicsSource: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, snapshot: &MarketSnapshot) -> Heuristics;
}

impl<F> HeuristicsSource for F
where
    F: Fn(&MarketSnapshot) -> Heuristics + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    fn evaluate(&self, snapshot: &MarketSnapshot) -> Heuristics {
        self(snapshot)
    }
}
