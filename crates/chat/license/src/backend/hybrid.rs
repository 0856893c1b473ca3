use async_trait::async_trait;

use super::{LicenseBackend, LocalBackend, RemoteBackend};
use crate::error::LicenseError;
use crate::record::LicenseRecord;

/// Remote first, local copy as fallback
///
/// Reads go to the remote store and are mirrored locally; when the remote is
/// unreachable the local copy answers. Writes go to both, and succeed if
/// either side accepted them.
#[derive(Debug, Clone)]
pub struct HybridBackend {
    remote: RemoteBackend,
    local: LocalBackend,
}

impl HybridBackend {
    /// Combine a remote and a local backend
    #[must_use]
    pub const fn new(remote: RemoteBackend, local: LocalBackend) -> Self {
        Self { remote, local }
    }
}

#[async_trait]
impl LicenseBackend for HybridBackend {
    async fn get(&self, key: &str) -> Result<Option<LicenseRecord>, LicenseError> {
        match self.remote.get(key).await {
            Ok(Some(record)) => {
                if let Err(e) = self.local.put(&record).await {
                    tracing::warn!(error = %e, "failed to mirror license record locally");
                }
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "remote license lookup failed; using local copy");
                self.local.get(key).await
            }
        }
    }

    async fn put(&self, record: &LicenseRecord) -> Result<(), LicenseError> {
        let remote = self.remote.put(record).await;
        let local = self.local.put(record).await;
        match (remote, local) {
            (Ok(()), _) | (_, Ok(())) => Ok(()),
            (Err(e), Err(_)) => Err(e),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, LicenseError> {
        let remote = self.remote.delete(key).await;
        let local = self.local.delete(key).await;
        match (remote, local) {
            (Ok(r), Ok(l)) => Ok(r || l),
            (Ok(r), Err(_)) => Ok(r),
            (Err(e), Ok(l)) => {
                tracing::warn!(error = %e, "remote license delete failed");
                Ok(l)
            }
            (Err(e), Err(_)) => Err(e),
        }
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>, LicenseError> {
        match self.remote.list().await {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(error = %e, "remote license listing failed; using local copy");
                self.local.list().await
            }
        }
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}
