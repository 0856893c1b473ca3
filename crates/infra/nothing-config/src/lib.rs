//! Layered configuration for the NothingAI chat client.
//!
//! This crate provides:
//! - [`NothingConfig`]: the root configuration with one section per concern
//! - [`load_merged`]: global + local file merge with env overrides
//! - [`schema`]: JSON Schema generation for editor completion
//! - [`validation`]: advisory validation that produces warnings
//!
//! # Configuration Precedence (lowest to highest)
//! 1. Default values
//! 2. Global config (`~/.config/nothingai/nothingai.json`)
//! 3. Local config (`./nothingai.json`)
//! 4. Environment variables
//!
//! # Example
//! ```no_run
//! use nothing_config::load_merged;
//! use std::path::Path;
//!
//! let loaded = load_merged(Path::new(".")).unwrap();
//! println!("Default model: {}", loaded.config.models.default_model);
//!
//! for warning in &loaded.warnings {
//!     eprintln!("Warning: {}", warning);
//! }
//! ```
//!
//! # Environment Variables
//! - `OPENROUTER_API_KEY`: completion gateway key (env-only)
//! - `HF_API_TOKEN`: blob image provider token (env-only)
//! - `NOTHINGAI_LICENSE_API_KEY`: remote license store token (env-only)
//! - `NOTHINGAI_COMPLETION_BASE_URL`: override the completion gateway URL
//! - `NOTHINGAI_MODEL_DEFAULT`: override the default chat model
//! - `NOTHINGAI_IMAGE_PROVIDER`: `url` or `blob`
//! - `NOTHINGAI_LICENSE_BACKEND`: `local`, `remote` or `hybrid`
//! - `NOTHINGAI_LICENSE_BASE_URL`: remote license store URL
//! - `NOTHINGAI_DATA_DIR`: override the data directory
//! - `NOTHINGAI_LOG_LEVEL`: override log level
//! - `NOTHINGAI_LOG_JSON`: enable JSON logging ("true" or "1")

pub mod loader;
pub mod merge;
pub mod schema;
pub mod types;
pub mod validation;
pub mod writer;

pub use loader::{LoadedNothingConfig, load_merged};
pub use schema::schema_json_pretty;
pub use types::NothingConfig;
