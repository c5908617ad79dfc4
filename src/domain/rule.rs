use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User- or config-defined signal rule. Rules are soft-disabled, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRule {
    pub id: String,
    pub name: String,
    pub symbol: String,
    /// Evaluation timeframe label, e.g. "1h", "4h", "1d"
    pub timeframe: String,
    pub enabled: bool,
    /// Strategy identifier the rule feeds
    pub strategy: String,
    /// Strategy-specific parameters
    pub params: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SignalRule {
    /// Create an enabled rule with a fresh id
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        strategy: impl Into<String>,
        params: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("rule_{}", Uuid::new_v4().simple()),
            name: name.into(),
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            enabled: true,
            strategy: strategy.into(),
            params,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self.updated_at = at;
        self
    }
}
