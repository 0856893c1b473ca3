use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use super::LicenseBackend;
use crate::error::LicenseError;
use crate::record::LicenseRecord;

/// In-process backend; nothing is persisted
///
/// Used by tests and by callers that seed records programmatically.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<BTreeMap<String, LicenseRecord>>,
}

impl MemoryBackend {
    /// Empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-filled with `records`
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = LicenseRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.key.clone(), r)).collect();
        Self {
            records: Mutex::new(map),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, LicenseRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LicenseBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<LicenseRecord>, LicenseError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn put(&self, record: &LicenseRecord) -> Result<(), LicenseError> {
        self.lock().insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, LicenseError> {
        Ok(self.lock().remove(key).is_some())
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>, LicenseError> {
        Ok(self.lock().values().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
