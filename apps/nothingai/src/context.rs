//! Shared setup for commands that touch services or the data directory.

use anyhow::{Context, Result};
use colored::Colorize;
use nothing_config::types::LicenseBackendKind;
use nothing_config::{NothingConfig, load_merged};
use nothing_license::{
    HybridBackend, LicenseBackend, LicenseGate, LocalBackend, RemoteBackend,
};
use nothing_store::Store;
use std::sync::Arc;

/// Merged configuration plus the opened store
pub struct AppContext {
    pub config: NothingConfig,
    pub store: Store,
}

impl AppContext {
    /// Load config from the current directory and open the data directory
    ///
    /// Advisory warnings are printed to stderr.
    pub fn load() -> Result<Self> {
        let loaded = load_merged(&std::env::current_dir()?)?;
        for warning in &loaded.warnings {
            eprintln!("{} {}", "WARN".yellow(), warning);
        }
        let data_dir = loaded.config.storage.resolve_data_dir()?;
        let store = Store::open(&data_dir)
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
        Ok(Self {
            config: loaded.config,
            store,
        })
    }

    /// License gate over the configured backend
    pub fn license_gate(&self) -> Result<LicenseGate> {
        let license = &self.config.license;
        let local = LocalBackend::new(self.store.clone());
        let remote = || -> Result<RemoteBackend> {
            let url = license
                .remote_base_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .context("license.remote_base_url must be set for the remote and hybrid backends")?;
            Ok(RemoteBackend::new(url).with_api_key(license.api_key.clone()))
        };
        let backend: Arc<dyn LicenseBackend> = match license.backend {
            LicenseBackendKind::Local => Arc::new(local),
            LicenseBackendKind::Remote => Arc::new(remote()?),
            LicenseBackendKind::Hybrid => Arc::new(HybridBackend::new(remote()?, local)),
        };
        Ok(LicenseGate::new(backend, self.store.clone())?)
    }

    /// Fail unless licensing is off or this device holds an active key
    pub async fn require_license(&self) -> Result<()> {
        if !self.config.license.required {
            return Ok(());
        }
        if self.license_gate()?.has_active_license().await {
            return Ok(());
        }
        anyhow::bail!(
            "An active license is required.\nRun `nothingai license activate <KEY>` first"
        )
    }
}
