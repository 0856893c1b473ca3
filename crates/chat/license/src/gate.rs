use chrono::{DateTime, Utc};
use nothing_store::Store;
use nothing_store::store::KEY_LICENSE;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::backend::LicenseBackend;
use crate::error::LicenseError;
use crate::obfuscate::{deobfuscate, obfuscate};
use crate::record::{self, LicenseRecord};

/// Result of checking a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    /// Why the key was rejected, or a short note when accepted
    pub reason: String,
}

impl ValidationOutcome {
    fn ok(reason: &str) -> Self {
        Self {
            valid: true,
            reason: reason.to_string(),
        }
    }

    fn reject(reason: &str) -> Self {
        Self {
            valid: false,
            reason: reason.to_string(),
        }
    }
}

/// Result of activating a key on this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationOutcome {
    pub success: bool,
    pub message: String,
}

/// What the gate knows about this device's activation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStatus {
    pub active: bool,
    /// Activated key with its last two groups masked
    pub key: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub device_id: String,
    pub backend: &'static str,
}

/// Activation kept in the local store, obfuscated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalActivation {
    key: String,
    device_id: String,
    activated_at: DateTime<Utc>,
}

/// Validates and activates license keys against a [`LicenseBackend`]
///
/// The gate owns every rule (format, expiry, revocation, device limit);
/// backends only store records. The activation for this device lives in the
/// local store under [`KEY_LICENSE`].
#[derive(Clone)]
pub struct LicenseGate {
    backend: Arc<dyn LicenseBackend>,
    store: Store,
    device_id: String,
}

impl std::fmt::Debug for LicenseGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseGate")
            .field("backend", &self.backend.name())
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

impl LicenseGate {
    /// Gate over `backend`, identifying this device through `store`
    ///
    /// # Errors
    ///
    /// Fails when the device id cannot be read or created.
    pub fn new(backend: Arc<dyn LicenseBackend>, store: Store) -> Result<Self, LicenseError> {
        let device_id = store.device_id()?;
        Ok(Self {
            backend,
            store,
            device_id,
        })
    }

    /// This device's id
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Name of the configured backend
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Check `key` without changing anything
    ///
    /// A key already activated on this device stays valid after its device
    /// limit is reached.
    pub async fn validate(&self, key: &str) -> Result<ValidationOutcome, LicenseError> {
        let key = record::normalize_key(key);
        if !record::is_well_formed(&key) {
            return Ok(ValidationOutcome::reject("Invalid license key format"));
        }
        let Some(record) = self.backend.get(&key).await? else {
            return Ok(ValidationOutcome::reject("License key not found"));
        };
        Ok(self.judge(&record, Utc::now()))
    }

    fn judge(&self, record: &LicenseRecord, now: DateTime<Utc>) -> ValidationOutcome {
        if record.is_expired(now) {
            return ValidationOutcome::reject("License key has expired");
        }
        if !record.is_active && !record.is_exhausted() {
            return ValidationOutcome::reject("License key has been revoked");
        }
        if record.is_used_by(&self.device_id) {
            return ValidationOutcome::ok("License already active on this device");
        }
        if record.is_exhausted() || !record.is_active {
            return ValidationOutcome::reject("License key usage limit reached");
        }
        ValidationOutcome::ok("License key is valid")
    }

    /// Validate `key` and claim a device slot for this device
    ///
    /// Activating a key this device already holds succeeds without using
    /// another slot.
    pub async fn activate(&self, key: &str) -> Result<ActivationOutcome, LicenseError> {
        let key = record::normalize_key(key);
        let verdict = self.validate(&key).await?;
        if !verdict.valid {
            tracing::info!(reason = %verdict.reason, "license activation refused");
            return Ok(ActivationOutcome {
                success: false,
                message: verdict.reason,
            });
        }

        let mut record = self
            .backend
            .get(&key)
            .await?
            .ok_or_else(|| LicenseError::NotFound(key.clone()))?;

        let message = if record.is_used_by(&self.device_id) {
            "License already active on this device"
        } else {
            record.usages += 1;
            record.used_by.push(self.device_id.clone());
            if record.is_exhausted() {
                record.is_active = false;
            }
            self.backend.put(&record).await?;
            "License activated"
        };

        self.save_activation(&LocalActivation {
            key: key.clone(),
            device_id: self.device_id.clone(),
            activated_at: Utc::now(),
        })?;
        tracing::info!(
            backend = self.backend.name(),
            usages = record.usages,
            max_usages = record.max_usages,
            "license activated"
        );
        Ok(ActivationOutcome {
            success: true,
            message: message.to_string(),
        })
    }

    /// Whether this device holds a usable activation
    ///
    /// The local activation is re-checked against the backend. When the
    /// backend cannot be reached the local activation is trusted.
    pub async fn has_active_license(&self) -> bool {
        let Some(activation) = self.load_activation() else {
            return false;
        };
        if activation.device_id != self.device_id {
            tracing::warn!("stored activation belongs to another device");
            return false;
        }
        match self.validate(&activation.key).await {
            Ok(verdict) => verdict.valid,
            Err(e) => {
                tracing::warn!(error = %e, "license backend unavailable; trusting local activation");
                true
            }
        }
    }

    /// Summary for display
    pub async fn status(&self) -> LicenseStatus {
        let activation = self.load_activation();
        LicenseStatus {
            active: self.has_active_license().await,
            key: activation.as_ref().map(|a| mask(&a.key)),
            activated_at: activation.map(|a| a.activated_at),
            device_id: self.device_id.clone(),
            backend: self.backend.name(),
        }
    }

    /// Drop this device's activation and release its slot
    ///
    /// Releasing the slot is best effort; the local activation is always
    /// removed. Returns `false` when there was nothing to deactivate.
    pub async fn deactivate(&self) -> Result<bool, LicenseError> {
        let activation = self.load_activation();
        let removed = self.store.remove(KEY_LICENSE)?;
        if let Some(activation) = activation
            && let Err(e) = self.release(&activation.key).await
        {
            tracing::warn!(error = %e, "could not release license slot");
        }
        Ok(removed)
    }

    async fn release(&self, key: &str) -> Result<(), LicenseError> {
        let Some(mut record) = self.backend.get(key).await? else {
            return Ok(());
        };
        let before = record.used_by.len();
        record.used_by.retain(|d| d != &self.device_id);
        if record.used_by.len() == before {
            return Ok(());
        }
        record.usages = record.usages.saturating_sub(1);
        // Revoked records have no holders, so this only reopens exhausted ones
        record.is_active = true;
        self.backend.put(&record).await
    }

    /// Issue a new key
    pub async fn generate(
        &self,
        max_usages: u32,
        expires_in_days: Option<u32>,
    ) -> Result<LicenseRecord, LicenseError> {
        let record = LicenseRecord::generate(
            &mut rand::thread_rng(),
            max_usages,
            expires_in_days,
            Utc::now(),
        )?;
        self.backend.put(&record).await?;
        tracing::info!(max_usages = record.max_usages, "license generated");
        Ok(record)
    }

    /// Every record in the backend, newest first
    pub async fn list(&self) -> Result<Vec<LicenseRecord>, LicenseError> {
        let mut records = self.backend.list().await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Deactivate a key for every holder
    pub async fn revoke(&self, key: &str) -> Result<LicenseRecord, LicenseError> {
        let key = record::normalize_key(key);
        let mut record = self
            .backend
            .get(&key)
            .await?
            .ok_or_else(|| LicenseError::NotFound(key.clone()))?;
        record.is_active = false;
        record.used_by.clear();
        self.backend.put(&record).await?;
        tracing::info!("license revoked");
        Ok(record)
    }

    /// Remove a key from the backend
    pub async fn delete(&self, key: &str) -> Result<(), LicenseError> {
        let key = record::normalize_key(key);
        if self.backend.delete(&key).await? {
            Ok(())
        } else {
            Err(LicenseError::NotFound(key))
        }
    }

    fn load_activation(&self) -> Option<LocalActivation> {
        let encoded: String = match self.store.get(KEY_LICENSE) {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored activation");
                return None;
            }
        };
        let plain = deobfuscate(&encoded)?;
        serde_json::from_str(&plain).ok()
    }

    fn save_activation(&self, activation: &LocalActivation) -> Result<(), LicenseError> {
        let plain =
            serde_json::to_string(activation).map_err(|e| LicenseError::Serde(e.to_string()))?;
        Ok(self.store.put(KEY_LICENSE, &obfuscate(&plain))?)
    }
}

/// `NOTHING-AB12-****-****`
fn mask(key: &str) -> String {
    let mut parts: Vec<String> = key.split('-').map(str::to_string).collect();
    for part in parts.iter_mut().skip(2) {
        *part = "*".repeat(part.len());
    }
    parts.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use chrono::Duration;

    fn record(key: &str, max_usages: u32) -> LicenseRecord {
        LicenseRecord {
            key: key.into(),
            usages: 0,
            max_usages,
            created_at: Utc::now(),
            expires_at: None,
            is_active: true,
            used_by: vec![],
        }
    }

    fn gate(records: Vec<LicenseRecord>, dir: &tempfile::TempDir) -> LicenseGate {
        let store = Store::open(dir.path()).unwrap();
        LicenseGate::new(Arc::new(MemoryBackend::with_records(records)), store).unwrap()
    }

    #[test]
    fn masks_trailing_groups() {
        assert_eq!(mask("NOTHING-AB12-CD34-EF56"), "NOTHING-AB12-****-****");
    }

    #[tokio::test]
    async fn rejects_bad_format_without_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(vec![], &dir);
        let out = gate.validate("NOTHING-123").await.unwrap();
        assert!(!out.valid);
        assert_eq!(out.reason, "Invalid license key format");
    }

    #[tokio::test]
    async fn judges_expired_revoked_and_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let mut expired = record("NOTHING-AAAA-AAAA-AAAA", 1);
        expired.expires_at = Some(Utc::now() - Duration::days(1));
        let mut revoked = record("NOTHING-BBBB-BBBB-BBBB", 1);
        revoked.is_active = false;
        let mut full = record("NOTHING-CCCC-CCCC-CCCC", 1);
        full.usages = 1;
        full.used_by = vec!["someone-else".into()];
        full.is_active = false;
        let gate = gate(vec![expired, revoked, full], &dir);

        let reasons = [
            ("NOTHING-AAAA-AAAA-AAAA", "License key has expired"),
            ("NOTHING-BBBB-BBBB-BBBB", "License key has been revoked"),
            ("NOTHING-CCCC-CCCC-CCCC", "License key usage limit reached"),
            ("NOTHING-DDDD-DDDD-DDDD", "License key not found"),
        ];
        for (key, reason) in reasons {
            let out = gate.validate(key).await.unwrap();
            assert!(!out.valid, "{key}");
            assert_eq!(out.reason, reason);
        }
    }

    #[tokio::test]
    async fn activation_is_idempotent_per_device() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(vec![record("NOTHING-AB12-CD34-EF56", 1)], &dir);

        let first = gate.activate("nothing-ab12-cd34-ef56").await.unwrap();
        assert!(first.success, "{}", first.message);
        let second = gate.activate("NOTHING-AB12-CD34-EF56").await.unwrap();
        assert!(second.success);
        assert_eq!(second.message, "License already active on this device");

        let rec = gate.backend.get("NOTHING-AB12-CD34-EF56").await.unwrap().unwrap();
        assert_eq!(rec.usages, 1);
        assert!(!rec.is_active);
        assert!(gate.has_active_license().await);
    }

    #[tokio::test]
    async fn activation_is_stored_obfuscated() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(vec![record("NOTHING-AB12-CD34-EF56", 2)], &dir);
        gate.activate("NOTHING-AB12-CD34-EF56").await.unwrap();

        let raw: String = gate.store.get(KEY_LICENSE).unwrap().unwrap();
        assert!(!raw.contains("NOTHING"));
        assert_eq!(gate.load_activation().unwrap().key, "NOTHING-AB12-CD34-EF56");
    }

    #[tokio::test]
    async fn revocation_ends_an_activation() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(vec![record("NOTHING-AB12-CD34-EF56", 3)], &dir);
        gate.activate("NOTHING-AB12-CD34-EF56").await.unwrap();
        assert!(gate.has_active_license().await);

        gate.revoke("NOTHING-AB12-CD34-EF56").await.unwrap();
        assert!(!gate.has_active_license().await);
    }

    #[tokio::test]
    async fn deactivate_releases_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(vec![record("NOTHING-AB12-CD34-EF56", 1)], &dir);
        gate.activate("NOTHING-AB12-CD34-EF56").await.unwrap();

        assert!(gate.deactivate().await.unwrap());
        assert!(!gate.has_active_license().await);
        let rec = gate.backend.get("NOTHING-AB12-CD34-EF56").await.unwrap().unwrap();
        assert_eq!(rec.usages, 0);
        assert!(rec.is_active);
        assert!(!gate.deactivate().await.unwrap());
    }

    #[tokio::test]
    async fn admin_generate_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(vec![], &dir);
        let issued = gate.generate(5, Some(30)).await.unwrap();
        assert!(record::is_well_formed(&issued.key));
        assert_eq!(gate.list().await.unwrap().len(), 1);

        gate.delete(&issued.key).await.unwrap();
        assert!(matches!(
            gate.delete(&issued.key).await,
            Err(LicenseError::NotFound(_))
        ));

        assert!(matches!(
            gate.generate(1, Some(u32::MAX)).await,
            Err(LicenseError::Validation(_))
        ));
        assert!(gate.list().await.unwrap().is_empty());
    }
}
