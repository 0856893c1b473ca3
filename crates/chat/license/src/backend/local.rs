use async_trait::async_trait;
use nothing_store::Store;
use nothing_store::store::KEY_LICENSE_RECORDS;
use std::collections::BTreeMap;

use super::LicenseBackend;
use crate::error::LicenseError;
use crate::record::LicenseRecord;

/// Records kept in the local store under one key, indexed by license key
#[derive(Debug, Clone)]
pub struct LocalBackend {
    store: Store,
}

impl LocalBackend {
    /// Backend over `store`
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    fn load(&self) -> Result<BTreeMap<String, LicenseRecord>, LicenseError> {
        Ok(self.store.get(KEY_LICENSE_RECORDS)?.unwrap_or_default())
    }

    fn save(&self, records: &BTreeMap<String, LicenseRecord>) -> Result<(), LicenseError> {
        Ok(self.store.put(KEY_LICENSE_RECORDS, records)?)
    }
}

#[async_trait]
impl LicenseBackend for LocalBackend {
    async fn get(&self, key: &str) -> Result<Option<LicenseRecord>, LicenseError> {
        Ok(self.load()?.remove(key))
    }

    async fn put(&self, record: &LicenseRecord) -> Result<(), LicenseError> {
        let mut records = self.load()?;
        records.insert(record.key.clone(), record.clone());
        self.save(&records)
    }

    async fn delete(&self, key: &str) -> Result<bool, LicenseError> {
        let mut records = self.load()?;
        let existed = records.remove(key).is_some();
        if existed {
            self.save(&records)?;
        }
        Ok(existed)
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>, LicenseError> {
        Ok(self.load()?.into_values().collect())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(key: &str) -> LicenseRecord {
        LicenseRecord {
            key: key.into(),
            usages: 0,
            max_usages: 2,
            created_at: Utc::now(),
            expires_at: None,
            is_active: true,
            used_by: vec![],
        }
    }

    #[tokio::test]
    async fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(Store::open(dir.path()).unwrap());

        backend.put(&record("NOTHING-AAAA-BBBB-CCCC")).await.unwrap();
        backend.put(&record("NOTHING-DDDD-EEEE-FFFF")).await.unwrap();
        assert_eq!(backend.list().await.unwrap().len(), 2);
        assert!(backend.get("NOTHING-AAAA-BBBB-CCCC").await.unwrap().is_some());

        assert!(backend.delete("NOTHING-AAAA-BBBB-CCCC").await.unwrap());
        assert!(!backend.delete("NOTHING-AAAA-BBBB-CCCC").await.unwrap());
        assert!(backend.get("NOTHING-AAAA-BBBB-CCCC").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        LocalBackend::new(Store::open(dir.path()).unwrap())
            .put(&record("NOTHING-AAAA-BBBB-CCCC"))
            .await
            .unwrap();
        let reopened = LocalBackend::new(Store::open(dir.path()).unwrap());
        assert_eq!(reopened.list().await.unwrap().len(), 1);
    }
}
