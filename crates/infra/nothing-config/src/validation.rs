//! Advisory validation for [`NothingConfig`].
//!
//! Problems become warnings, never hard errors; callers decide whether to
//! print or log them.

use crate::types::{LicenseBackendKind, NothingConfig};

/// Inclusive bounds accepted by the image providers.
pub const IMAGE_DIMENSION_RANGE: std::ops::RangeInclusive<u32> = 256..=2048;

/// An advisory warning about a configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryWarning {
    /// Machine-readable warning code.
    pub code: &'static str,

    /// Human-readable warning message.
    pub message: String,

    /// JSON path to the problematic field.
    pub path: &'static str,
}

impl std::fmt::Display for AdvisoryWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message)
    }
}

/// Validate a configuration and return advisory warnings.
pub fn validate(cfg: &NothingConfig) -> Vec<AdvisoryWarning> {
    let mut warnings = vec![];

    validate_url(
        &cfg.services.completion.base_url,
        "services.completion.base_url",
        "services.completion.base_url.invalid",
        &mut warnings,
    );
    validate_url(
        &cfg.services.images.blob_base_url,
        "services.images.blob_base_url",
        "services.images.blob_base_url.invalid",
        &mut warnings,
    );

    if cfg.services.images.endpoints.is_empty() {
        warnings.push(AdvisoryWarning {
            code: "services.images.endpoints.empty",
            path: "services.images.endpoints",
            message: "No URL image endpoints configured".into(),
        });
    }
    for endpoint in &cfg.services.images.endpoints {
        if !endpoint.contains("{prompt}") {
            warnings.push(AdvisoryWarning {
                code: "services.images.endpoints.placeholder",
                path: "services.images.endpoints",
                message: format!("Endpoint template has no {{prompt}} placeholder: '{endpoint}'"),
            });
        }
        validate_url(
            endpoint,
            "services.images.endpoints",
            "services.images.endpoints.invalid",
            &mut warnings,
        );
    }

    if cfg.services.images.max_retries == 0 {
        warnings.push(AdvisoryWarning {
            code: "services.images.max_retries.zero",
            path: "services.images.max_retries",
            message: "max_retries of 0 skips every endpoint; 1 is the minimum useful value".into(),
        });
    }

    validate_non_empty(
        &cfg.models.default_model,
        "models.default_model",
        "models.default_model.empty",
        &mut warnings,
    );

    let generation = &cfg.generation;
    if !(0.0..=2.0).contains(&generation.temperature) {
        warnings.push(AdvisoryWarning {
            code: "generation.temperature.range",
            path: "generation.temperature",
            message: format!(
                "temperature {} is outside 0.0..=2.0",
                generation.temperature
            ),
        });
    }
    if !(generation.top_p > 0.0 && generation.top_p <= 1.0) {
        warnings.push(AdvisoryWarning {
            code: "generation.top_p.range",
            path: "generation.top_p",
            message: format!("top_p {} is outside (0.0, 1.0]", generation.top_p),
        });
    }
    if generation.max_tokens == 0 {
        warnings.push(AdvisoryWarning {
            code: "generation.max_tokens.zero",
            path: "generation.max_tokens",
            message: "max_tokens must be at least 1".into(),
        });
    }

    for (value, path, code) in [
        (cfg.images.width, "images.width", "images.width.range"),
        (cfg.images.height, "images.height", "images.height.range"),
    ] {
        if !IMAGE_DIMENSION_RANGE.contains(&value) {
            warnings.push(AdvisoryWarning {
                code,
                path,
                message: format!("{value} is outside 256..=2048"),
            });
        }
    }

    if cfg.license.backend != LicenseBackendKind::Local {
        match cfg.license.remote_base_url.as_deref() {
            Some(url) => validate_url(
                url,
                "license.remote_base_url",
                "license.remote_base_url.invalid",
                &mut warnings,
            ),
            None => warnings.push(AdvisoryWarning {
                code: "license.remote_base_url.missing",
                path: "license.remote_base_url",
                message: "Remote or hybrid license backend needs remote_base_url".into(),
            }),
        }
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&cfg.logging.level.to_lowercase().as_str()) {
        warnings.push(AdvisoryWarning {
            code: "logging.level.invalid",
            path: "logging.level",
            message: format!(
                "Unknown log level '{}'. Expected one of: {}",
                cfg.logging.level,
                valid_levels.join(", ")
            ),
        });
    }

    warnings
}

fn validate_url(
    url: &str,
    path: &'static str,
    code: &'static str,
    warnings: &mut Vec<AdvisoryWarning>,
) {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        warnings.push(AdvisoryWarning {
            code,
            path,
            message: format!("Expected an http(s) URL, got: '{url}'"),
        });
    }
}

fn validate_non_empty(
    value: &str,
    path: &'static str,
    code: &'static str,
    warnings: &mut Vec<AdvisoryWarning>,
) {
    if value.trim().is_empty() {
        warnings.push(AdvisoryWarning {
            code,
            path,
            message: "Value cannot be empty".into(),
        });
    }
}
