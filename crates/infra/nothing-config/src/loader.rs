//! Configuration loader with two-layer merge and env overrides.
//!
//! Loading order:
//! 1. Read global config from `~/.config/nothingai/nothingai.json`
//! 2. Read local config from `./nothingai.json`
//! 3. Merge the two at the JSON value level (RFC 7396)
//! 4. Deserialize once into [`NothingConfig`]
//! 5. Apply env var overrides
//! 6. Run advisory validation

use crate::merge::merge_patch;
use crate::types::{ImageProviderKind, LicenseBackendKind, NothingConfig};
use crate::validation::AdvisoryWarning;
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Filename for local config.
pub const LOCAL_FILE: &str = "nothingai.json";

/// Directory name under `config_dir` for global config.
pub const GLOBAL_DIR: &str = "nothingai";

/// Filename for global config.
pub const GLOBAL_FILE: &str = "nothingai.json";

/// Resolved paths for config files.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Path to local config (`./nothingai.json`).
    pub local: PathBuf,

    /// Path to global config (`~/.config/nothingai/nothingai.json`).
    pub global: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct LoadedNothingConfig {
    /// The merged configuration.
    pub config: NothingConfig,

    /// Advisory warnings from validation.
    pub warnings: Vec<AdvisoryWarning>,

    /// Resolved config file paths.
    pub paths: ConfigPaths,
}

/// Get the global config file path.
pub fn global_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config dir")?;
    Ok(base.join(GLOBAL_DIR).join(GLOBAL_FILE))
}

/// Get the local config file path for a given directory.
pub fn local_config_path(local_dir: &Path) -> PathBuf {
    local_dir.join(LOCAL_FILE)
}

/// Load and merge configuration from the global and local files.
pub fn load_merged(local_dir: &Path) -> Result<LoadedNothingConfig> {
    let global_path = global_config_path()?;
    load_merged_from(&global_path, local_dir)
}

/// Same as [`load_merged`] with an explicit global config path.
pub fn load_merged_from(global_path: &Path, local_dir: &Path) -> Result<LoadedNothingConfig> {
    let local_path = local_config_path(local_dir);

    let global_v = read_json_object_or_empty(global_path)?;
    let local_v = read_json_object_or_empty(&local_path)?;
    let merged = merge_patch(global_v, local_v);

    let mut cfg: NothingConfig =
        serde_json::from_value(merged).context("Failed to deserialize merged nothingai config")?;

    apply_env_overrides(&mut cfg);

    let warnings = crate::validation::validate(&cfg);
    for w in &warnings {
        tracing::debug!(code = w.code, path = w.path, "{}", w.message);
    }

    Ok(LoadedNothingConfig {
        config: cfg,
        warnings,
        paths: ConfigPaths {
            local: local_path,
            global: global_path.to_path_buf(),
        },
    })
}

fn apply_env_overrides(cfg: &mut NothingConfig) {
    if let Some(v) = env_trimmed("NOTHINGAI_COMPLETION_BASE_URL") {
        cfg.services.completion.base_url = v;
    }
    if let Some(v) = env_trimmed("NOTHINGAI_IMAGE_PROVIDER") {
        match v.to_lowercase().as_str() {
            "url" => cfg.services.images.provider = ImageProviderKind::Url,
            "blob" => cfg.services.images.provider = ImageProviderKind::Blob,
            other => tracing::warn!("Ignoring unknown NOTHINGAI_IMAGE_PROVIDER '{other}'"),
        }
    }

    // Secrets are env-only
    if let Some(k) = env_trimmed("OPENROUTER_API_KEY") {
        cfg.services.completion.api_key = Some(SecretString::from(k));
    }
    if let Some(k) = env_trimmed("HF_API_TOKEN") {
        cfg.services.images.api_key = Some(SecretString::from(k));
    }
    if let Some(k) = env_trimmed("NOTHINGAI_LICENSE_API_KEY") {
        cfg.license.api_key = Some(SecretString::from(k));
    }

    if let Some(v) = env_trimmed("NOTHINGAI_MODEL_DEFAULT") {
        cfg.models.default_model = v;
    }

    if let Some(v) = env_trimmed("NOTHINGAI_LICENSE_BACKEND") {
        match v.to_lowercase().as_str() {
            "local" => cfg.license.backend = LicenseBackendKind::Local,
            "remote" => cfg.license.backend = LicenseBackendKind::Remote,
            "hybrid" => cfg.license.backend = LicenseBackendKind::Hybrid,
            other => tracing::warn!("Ignoring unknown NOTHINGAI_LICENSE_BACKEND '{other}'"),
        }
    }
    if let Some(v) = env_trimmed("NOTHINGAI_LICENSE_BASE_URL") {
        cfg.license.remote_base_url = Some(v);
    }

    if let Some(v) = env_trimmed("NOTHINGAI_DATA_DIR") {
        cfg.storage.data_dir = Some(v);
    }

    if let Some(v) = env_trimmed("NOTHINGAI_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_trimmed("NOTHINGAI_LOG_JSON") {
        cfg.logging.json = v.eq_ignore_ascii_case("true") || v == "1";
    }
}

/// Read and normalize an env var (trim + filter empty).
pub fn env_trimmed(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a JSON file as a Value, returning an empty object if it doesn't exist.
fn read_json_object_or_empty(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let v: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    if v.is_object() {
        Ok(v)
    } else {
        anyhow::bail!("Config root must be a JSON object: {}", path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use tempfile::TempDir;

    fn load_isolated(temp: &TempDir) -> Result<LoadedNothingConfig> {
        load_merged_from(&temp.path().join("no-global.json"), temp.path())
    }

    #[test]
    #[serial(env)]
    fn no_files_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let loaded = load_isolated(&temp).unwrap();

        assert_eq!(
            loaded.config.services.completion.base_url,
            "https://openrouter.ai/api/v1"
        );
        assert_eq!(loaded.config.images.width, 1024);
    }

    #[test]
    #[serial(env)]
    fn local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.json");
        std::fs::write(
            &global,
            r#"{"models": {"default_model": "global-model"}, "images": {"width": 640}}"#,
        )
        .unwrap();
        std::fs::write(
            temp.path().join(LOCAL_FILE),
            r#"{"models": {"default_model": "local-model"}}"#,
        )
        .unwrap();

        let loaded = load_merged_from(&global, temp.path()).unwrap();
        assert_eq!(loaded.config.models.default_model, "local-model");
        // Untouched global values survive the merge
        assert_eq!(loaded.config.images.width, 640);
    }

    #[test]
    #[serial(env)]
    fn local_null_removes_global_value() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.json");
        std::fs::write(&global, r#"{"storage": {"data_dir": "/srv/nothing"}}"#).unwrap();
        std::fs::write(
            temp.path().join(LOCAL_FILE),
            r#"{"storage": {"data_dir": null}}"#,
        )
        .unwrap();

        let loaded = load_merged_from(&global, temp.path()).unwrap();
        assert!(loaded.config.storage.data_dir.is_none());
    }

    #[test]
    #[serial(env)]
    fn env_overrides_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(LOCAL_FILE),
            r#"{"models": {"default_model": "file-model"}}"#,
        )
        .unwrap();

        // SAFETY: serialized via #[serial(env)]
        unsafe {
            std::env::set_var("NOTHINGAI_MODEL_DEFAULT", "env-model");
            std::env::set_var("NOTHINGAI_LICENSE_BACKEND", "Remote");
            std::env::set_var("OPENROUTER_API_KEY", "  sk-or-test  ");
        }

        let loaded = load_isolated(&temp).unwrap();

        // SAFETY: serialized via #[serial(env)]
        unsafe {
            std::env::remove_var("NOTHINGAI_MODEL_DEFAULT");
            std::env::remove_var("NOTHINGAI_LICENSE_BACKEND");
            std::env::remove_var("OPENROUTER_API_KEY");
        }

        assert_eq!(loaded.config.models.default_model, "env-model");
        assert_eq!(loaded.config.license.backend, LicenseBackendKind::Remote);
        let key = loaded.config.services.completion.api_key.unwrap();
        assert_eq!(key.expose_secret(), "sk-or-test");
    }

    #[test]
    #[serial(env)]
    fn unknown_provider_env_is_ignored() {
        let temp = TempDir::new().unwrap();
        // SAFETY: serialized via #[serial(env)]
        unsafe {
            std::env::set_var("NOTHINGAI_IMAGE_PROVIDER", "carrier-pigeon");
        }
        let loaded = load_isolated(&temp).unwrap();
        // SAFETY: serialized via #[serial(env)]
        unsafe {
            std::env::remove_var("NOTHINGAI_IMAGE_PROVIDER");
        }
        assert_eq!(loaded.config.services.images.provider, ImageProviderKind::Url);
    }

    #[test]
    #[serial(env)]
    fn env_trimmed_filters_blank() {
        // SAFETY: serialized via #[serial(env)]
        unsafe {
            std::env::set_var("NOTHINGAI_TEST_TRIM", "  value  ");
            std::env::set_var("NOTHINGAI_TEST_BLANK", "   ");
        }
        assert_eq!(env_trimmed("NOTHINGAI_TEST_TRIM").as_deref(), Some("value"));
        assert_eq!(env_trimmed("NOTHINGAI_TEST_BLANK"), None);
        // SAFETY: serialized via #[serial(env)]
        unsafe {
            std::env::remove_var("NOTHINGAI_TEST_TRIM");
            std::env::remove_var("NOTHINGAI_TEST_BLANK");
        }
    }

    #[test]
    fn invalid_json_errors() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(LOCAL_FILE), "{ nope").unwrap();

        let err = load_isolated(&temp).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn non_object_root_errors() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(LOCAL_FILE), "[1, 2, 3]").unwrap();

        let err = load_isolated(&temp).unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }

    #[test]
    fn paths_are_reported() {
        let temp = TempDir::new().unwrap();
        let loaded = load_isolated(&temp).unwrap();
        assert_eq!(loaded.paths.local, temp.path().join(LOCAL_FILE));
        assert!(loaded.paths.global.ends_with("no-global.json"));
        assert!(global_config_path().unwrap().ends_with("nothingai/nothingai.json"));
    }
}
