//! Model/token fallback policy for chat completions.
//!
//! Pure state machine: the resource drives it, this module only decides
//! what the next attempt looks like.

use crate::catalog::ModelCatalog;

/// Attempts made for one chat call before giving up
pub const MAX_ATTEMPTS: u32 = 3;

/// Model and token budget of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number
    pub number: u32,
    /// Model to request
    pub model: String,
    /// Token budget, already clamped to the model's tier
    pub max_tokens: u32,
}

/// Tracks the current attempt and computes the next one
#[derive(Debug, Clone)]
pub struct FallbackState<'a> {
    catalog: &'a ModelCatalog,
    current: Attempt,
}

impl<'a> FallbackState<'a> {
    /// First attempt uses the requested model with a clamped budget
    #[must_use]
    pub fn start(catalog: &'a ModelCatalog, model: &str, max_tokens: u32) -> Self {
        Self {
            catalog,
            current: Attempt {
                number: 1,
                model: model.to_string(),
                max_tokens: catalog.clamp_tokens(model, max_tokens),
            },
        }
    }

    /// The attempt to run now
    #[must_use]
    pub const fn current(&self) -> &Attempt {
        &self.current
    }

    /// Move to the next attempt after a failure
    ///
    /// A model other than the top free one is swapped for it with the free
    /// tier's safe budget. On the top free model the budget shrinks to 70%
    /// instead. Returns `None` once [`MAX_ATTEMPTS`] is reached.
    pub fn advance(&mut self) -> Option<&Attempt> {
        if self.current.number >= MAX_ATTEMPTS {
            return None;
        }

        let (model, max_tokens) = match self.catalog.top_free() {
            Some(free) if free.id != self.current.model => {
                (free.id.clone(), free.tier.limits().safe_tokens)
            }
            _ => (self.current.model.clone(), shrink(self.current.max_tokens)),
        };

        self.current = Attempt {
            number: self.current.number + 1,
            max_tokens: self.catalog.clamp_tokens(&model, max_tokens),
            model,
        };
        Some(&self.current)
    }
}

/// 70% of the budget, rounded down, never below 1
const fn shrink(tokens: u32) -> u32 {
    let reduced = tokens / 10 * 7 + tokens % 10 * 7 / 10;
    if reduced == 0 { 1 } else { reduced }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ModelCatalog, ModelInfo, ModelTier};

    const TOP_FREE: &str = "meta-llama/llama-3.3-70b-instruct:free";

    #[test]
    fn premium_falls_back_to_top_free_with_safe_budget() {
        let catalog = ModelCatalog::default();
        let mut state = FallbackState::start(&catalog, "openai/gpt-4o", 8000);
        assert_eq!(state.current().max_tokens, 8000);

        let second = state.advance().unwrap().clone();
        assert_eq!(second.number, 2);
        assert_eq!(second.model, TOP_FREE);
        assert_eq!(second.max_tokens, 2048);

        let third = state.advance().unwrap().clone();
        assert_eq!(third.model, TOP_FREE);
        assert_eq!(third.max_tokens, 1433);

        assert!(state.advance().is_none());
    }

    #[test]
    fn switch_to_free_uses_its_safe_budget_not_the_request() {
        let catalog = ModelCatalog::default();
        let mut state = FallbackState::start(&catalog, "openai/gpt-4o", 500);
        let second = state.advance().unwrap().clone();
        assert_eq!(second.model, TOP_FREE);
        assert_eq!(second.max_tokens, 2048);
        assert_eq!(state.advance().unwrap().max_tokens, 1433);
    }

    #[test]
    fn top_free_shrinks_in_place() {
        let catalog = ModelCatalog::default();
        let mut state = FallbackState::start(&catalog, TOP_FREE, 10_000);
        assert_eq!(state.current().max_tokens, 4096);
        assert_eq!(state.advance().unwrap().max_tokens, 2867);
        assert_eq!(state.advance().unwrap().max_tokens, 2006);
        assert!(state.advance().is_none());
    }

    #[test]
    fn budget_never_reaches_zero() {
        let catalog = ModelCatalog::default();
        let mut state = FallbackState::start(&catalog, TOP_FREE, 1);
        assert_eq!(state.advance().unwrap().max_tokens, 1);
    }

    #[test]
    fn catalog_without_free_models_shrinks() {
        let catalog =
            ModelCatalog::from_models(vec![ModelInfo::new("p/one", "One", ModelTier::Premium)]);
        let mut state = FallbackState::start(&catalog, "p/one", 1000);
        let next = state.advance().unwrap();
        assert_eq!(next.model, "p/one");
        assert_eq!(next.max_tokens, 700);
    }

    proptest::proptest! {
        #[test]
        fn budgets_are_clamped_and_shrink_on_the_same_model(
            model_idx in 0usize..7,
            requested in 0u32..100_000,
        ) {
            let catalog = ModelCatalog::default();
            let model = catalog.models()[model_idx].id.clone();
            let mut state = FallbackState::start(&catalog, &model, requested);
            let mut previous = state.current().clone();
            let mut attempts = 1;
            while let Some(next) = state.advance() {
                attempts += 1;
                let limits = catalog.tier_of(&next.model).limits();
                proptest::prop_assert!(next.max_tokens >= 1);
                proptest::prop_assert!(next.max_tokens <= limits.max_tokens);
                if next.model == previous.model {
                    proptest::prop_assert!(next.max_tokens <= previous.max_tokens);
                } else {
                    proptest::prop_assert_eq!(next.max_tokens, limits.safe_tokens);
                }
                previous = next.clone();
            }
            proptest::prop_assert_eq!(attempts, MAX_ATTEMPTS);
        }
    }
}
