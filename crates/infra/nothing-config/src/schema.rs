//! JSON Schema for [`NothingConfig`], used by `nothingai config schema`.

use crate::types::NothingConfig;
use schemars::{Schema, generate::SchemaSettings};

/// Generate the JSON Schema for [`NothingConfig`].
pub fn schema() -> Schema {
    SchemaSettings::default()
        .into_generator()
        .into_root_schema_for::<NothingConfig>()
}

/// Generate the JSON Schema as a pretty-printed JSON string.
pub fn schema_json_pretty() -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&schema())?)
}
