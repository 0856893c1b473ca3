use completion_async::{CompletionConfig, ModelCatalog, ModelInfo, ModelTier};
use imagegen_async::ImageConfig;
use nothing_config::NothingConfig;
use nothing_config::types::{ImageProviderKind, ModelTierName, ModelsConfig};
use nothing_logging::{LogWriter, logging_disabled};
use nothing_moderation::ContentModerator;
use nothing_store::{ConversationSettings, ImageProviderSetting, Store};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ChatError;

/// Everything a chat session talks to, built once at startup
#[derive(Debug, Clone)]
pub struct ChatServices {
    pub completion: completion_async::Client<CompletionConfig>,
    pub images: imagegen_async::Client<ImageConfig>,
    pub moderator: Arc<ContentModerator>,
    pub store: Store,
    /// `None` disables the generation log
    pub log: Option<LogWriter>,
    /// Prepended to every transcript when non-empty
    pub system_prompt: String,
    /// Sent with blob provider requests
    pub negative_prompt: Option<String>,
}

impl ChatServices {
    /// Build clients and the content filter from configuration
    pub fn from_config(config: &NothingConfig, store: Store) -> Result<Self, ChatError> {
        let svc = &config.services;

        let mut completion = CompletionConfig::new()
            .with_api_base(svc.completion.base_url.clone())
            .with_timeout(Duration::from_secs(svc.completion.timeout_secs));
        if svc.completion.api_key.is_some() {
            completion = completion.with_secret(svc.completion.api_key.clone());
        }
        if let Some(referer) = &svc.completion.referer {
            completion = completion.with_referer(referer.clone());
        }
        if let Some(title) = &svc.completion.title {
            completion = completion.with_title(title.clone());
        }

        let mut images = ImageConfig::new()
            .with_endpoints(svc.images.endpoints.iter().cloned())
            .with_blob_base(svc.images.blob_base_url.clone())
            .with_timeout(Duration::from_secs(svc.images.timeout_secs))
            .with_max_retries(svc.images.max_retries)
            .with_retry_delay(Duration::from_millis(svc.images.retry_delay_ms));
        if svc.images.api_key.is_some() {
            images = images.with_secret(svc.images.api_key.clone());
        }

        let log = (!logging_disabled()).then(|| LogWriter::in_data_dir(store.root()));

        Ok(Self {
            completion: completion_async::Client::with_config(completion)
                .with_catalog(catalog_from_config(&config.models)),
            images: imagegen_async::Client::with_config(images),
            moderator: Arc::new(ContentModerator::new()?),
            store,
            log,
            system_prompt: config.generation.system_prompt.clone(),
            negative_prompt: config.images.negative_prompt.clone(),
        })
    }
}

/// Built-in catalog with configured entries added or replaced
pub fn catalog_from_config(models: &ModelsConfig) -> ModelCatalog {
    models
        .catalog
        .iter()
        .fold(ModelCatalog::default(), |catalog, entry| {
            let tier = match entry.tier {
                ModelTierName::Free => ModelTier::Free,
                ModelTierName::Affordable => ModelTier::Affordable,
                ModelTierName::Premium => ModelTier::Premium,
            };
            let name = entry.name.clone().unwrap_or_else(|| entry.id.clone());
            let mut info = ModelInfo::new(entry.id.clone(), name, tier);
            if entry.vision {
                info = info.with_vision();
            }
            catalog.with_model(info)
        })
}

/// Settings for new conversations
pub fn settings_from_config(config: &NothingConfig) -> ConversationSettings {
    ConversationSettings {
        model: config.models.default_model.clone(),
        temperature: config.generation.temperature,
        max_tokens: config.generation.max_tokens,
        top_p: config.generation.top_p,
        image_model: config.images.model.clone(),
        image_width: config.images.width,
        image_height: config.images.height,
        enhance: config.images.enhance,
        image_provider: match config.services.images.provider {
            ImageProviderKind::Url => ImageProviderSetting::Url,
            ImageProviderKind::Blob => ImageProviderSetting::Blob,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nothing_config::types::ModelEntryConfig;

    #[test]
    fn configured_models_join_the_catalog() {
        let models = ModelsConfig {
            default_model: "acme/big".into(),
            catalog: vec![
                ModelEntryConfig {
                    id: "acme/big".into(),
                    name: None,
                    tier: ModelTierName::Premium,
                    vision: true,
                },
                ModelEntryConfig {
                    id: "meta-llama/llama-3.3-70b-instruct:free".into(),
                    name: Some("Llama".into()),
                    tier: ModelTierName::Free,
                    vision: false,
                },
            ],
        };
        let catalog = catalog_from_config(&models);
        let big = catalog.get("acme/big").unwrap();
        assert_eq!(big.tier, ModelTier::Premium);
        assert!(big.vision);
        assert_eq!(big.name, "acme/big");
        assert_eq!(
            catalog.models().len(),
            ModelCatalog::default().models().len() + 1
        );
    }

    #[test]
    fn settings_follow_config() {
        let mut config = NothingConfig::default();
        config.images.width = 512;
        config.services.images.provider = ImageProviderKind::Blob;
        let settings = settings_from_config(&config);
        assert_eq!(settings.image_width, 512);
        assert_eq!(settings.image_provider, ImageProviderSetting::Blob);
        assert_eq!(settings.model, config.models.default_model);
    }
}
