//! Model catalog and per-tier token ceilings.

use serde::{Deserialize, Serialize};

/// Cost/capability class of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// No-cost models
    Free,
    /// Low-cost models
    Affordable,
    /// Highest-capability models
    Premium,
}

/// Token ceilings for a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    /// Hard cap applied to every request
    pub max_tokens: u32,
    /// Budget used when falling back onto this tier
    pub safe_tokens: u32,
}

impl ModelTier {
    /// Ceilings for this tier
    #[must_use]
    pub const fn limits(self) -> TierLimits {
        match self {
            Self::Free => TierLimits {
                max_tokens: 4096,
                safe_tokens: 2048,
            },
            Self::Affordable => TierLimits {
                max_tokens: 8192,
                safe_tokens: 4096,
            },
            Self::Premium => TierLimits {
                max_tokens: 16384,
                safe_tokens: 8192,
            },
        }
    }

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Affordable => "affordable",
            Self::Premium => "premium",
        }
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Gateway model identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Tier governing token ceilings
    pub tier: ModelTier,
    /// Accepts image attachments
    pub vision: bool,
}

impl ModelInfo {
    /// New entry
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, tier: ModelTier) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier,
            vision: false,
        }
    }

    /// Marks the model as accepting images
    #[must_use]
    pub const fn with_vision(mut self) -> Self {
        self.vision = true;
        self
    }
}

/// Ranked list of known models
///
/// Order matters: the first free entry is the fallback target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        use ModelTier::{Affordable, Free, Premium};
        Self {
            models: vec![
                ModelInfo::new(
                    "meta-llama/llama-3.3-70b-instruct:free",
                    "Llama 3.3 70B (free)",
                    Free,
                ),
                ModelInfo::new(
                    "google/gemini-2.0-flash-exp:free",
                    "Gemini 2.0 Flash (free)",
                    Free,
                )
                .with_vision(),
                ModelInfo::new(
                    "mistralai/mistral-7b-instruct:free",
                    "Mistral 7B (free)",
                    Free,
                ),
                ModelInfo::new("openai/gpt-4o-mini", "GPT-4o mini", Affordable).with_vision(),
                ModelInfo::new("anthropic/claude-3.5-haiku", "Claude 3.5 Haiku", Affordable),
                ModelInfo::new("openai/gpt-4o", "GPT-4o", Premium).with_vision(),
                ModelInfo::new("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet", Premium)
                    .with_vision(),
            ],
        }
    }
}

impl ModelCatalog {
    /// Catalog with exactly these entries, in this order
    #[must_use]
    pub const fn from_models(models: Vec<ModelInfo>) -> Self {
        Self { models }
    }

    /// Adds an entry, replacing any entry with the same id in place
    #[must_use]
    pub fn with_model(mut self, info: ModelInfo) -> Self {
        match self.models.iter_mut().find(|m| m.id == info.id) {
            Some(existing) => *existing = info,
            None => self.models.push(info),
        }
        self
    }

    /// All entries in rank order
    #[must_use]
    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    /// Entry by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Tier of a model; unknown `:free` ids are free, other unknown ids affordable
    #[must_use]
    pub fn tier_of(&self, id: &str) -> ModelTier {
        self.get(id).map_or_else(
            || {
                if id.ends_with(":free") {
                    ModelTier::Free
                } else {
                    ModelTier::Affordable
                }
            },
            |m| m.tier,
        )
    }

    /// The highest-ranked free model
    #[must_use]
    pub fn top_free(&self) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.tier == ModelTier::Free)
    }

    /// Clamp a token request to the model's tier maximum, never below 1
    #[must_use]
    pub fn clamp_tokens(&self, id: &str, requested: u32) -> u32 {
        requested.clamp(1, self.tier_of(id).limits().max_tokens)
    }
}
