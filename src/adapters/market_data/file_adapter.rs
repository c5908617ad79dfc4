//! Fixture-backed provider
//!
//! Serves snapshots from `<dir>/<chain>/<address>.json`. Useful for offline
//! runs and as a deterministic last-resort provider.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::{MarketSnapshot, ProviderId};
use crate::ports::{AdapterError, AdapterResponse, ProviderAdapter, SnapshotParams};

#[derive(Debug, Clone)]
pub struct FileSnapshotAdapter {
    id: ProviderId,
    dir: PathBuf,
    /// Stamp `metadata.timestamp` with the read time instead of the file's value
    restamp: bool,
}

impl FileSnapshotAdapter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            id: ProviderId::from("fixtures"),
            dir: dir.as_ref().to_path_buf(),
            restamp: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn keep_timestamps(mut self) -> Self {
        self.restamp = false;
        self
    }

    pub fn path_for(&self, params: &SnapshotParams) -> PathBuf {
        self.dir
            .join(params.chain.to_lowercase())
            .join(format!("{}.json", params.address))
    }
}

#[async_trait]
impl ProviderAdapter for FileSnapshotAdapter {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn fetch_snapshot(
        &self,
        params: &SnapshotParams,
    ) -> Result<AdapterResponse<MarketSnapshot>, AdapterError> {
        let path = self.path_for(params);
        debug!("Reading snapshot fixture {:?}", path);

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AdapterError::NotFound(params.address.clone()));
            }
            Err(e) => return Err(AdapterError::Http(format!("{:?}: {}", path, e))),
        };

        let mut snapshot: MarketSnapshot = serde_json::from_str(&contents)
            .map_err(|e| AdapterError::Parse(format!("{:?}: {}", path, e)))?;

        snapshot.metadata.provider = self.id.to_string();
        snapshot.metadata.cached = false;
        if self.restamp {
            snapshot.metadata.timestamp = Utc::now();
        }

        Ok(AdapterResponse::ok(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::fixtures;
    use tempfile::TempDir;

    fn write_fixture(dir: &Path, chain: &str, address: &str, body: &str) {
        let chain_dir = dir.join(chain);
        std::fs::create_dir_all(&chain_dir).unwrap();
        std::fs::write(chain_dir.join(format!("{}.json", address)), body).unwrap();
    }

    #[tokio::test]
    async fn test_reads_fixture() {
        let tmp = TempDir::new().unwrap();
        let snap = fixtures::snapshot();
        write_fixture(
            tmp.path(),
            "solana",
            &snap.token.address,
            &serde_json::to_string(&snap).unwrap(),
        );

        let adapter = FileSnapshotAdapter::new(tmp.path());
        let params = SnapshotParams::new(snap.token.address.clone(), "Solana");
        let got = adapter.fetch_snapshot(&params).await.unwrap().into_result().unwrap();

        assert_eq!(got.price, snap.price);
        assert_eq!(got.metadata.provider, "fixtures");
        assert!(!got.metadata.cached);
    }

    #[tokio::test]
    async fn test_missing_fixture_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let adapter = FileSnapshotAdapter::new(tmp.path());
        let err = adapter
            .fetch_snapshot(&SnapshotParams::new("nope", "solana"))
            .await
            .unwrap_err();
        assert_eq!(err, AdapterError::NotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn test_corrupt_fixture_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        write_fixture(tmp.path(), "solana", "bad", "{ not json");
        let adapter = FileSnapshotAdapter::new(tmp.path()).with_id("local");
        let err = adapter
            .fetch_snapshot(&SnapshotParams::new("bad", "solana"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Parse(_)));
        assert_eq!(adapter.id().as_str(), "local");
    }
}
