use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::categories::{AGE_WORDS, Category, ROLE_WORDS, SYNONYMS, synonym_for};
use crate::normalize::{contains_phrase, fold, normalize};

/// Errors building the moderator's matchers.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("invalid fuzzy pattern for '{term}': {source}")]
    Pattern {
        term: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Outcome of a moderation check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    pub is_blocked: bool,
    /// Label of the most severe matched category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Most severe category that matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_terms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ModerationResult {
    /// A passing result.
    pub fn allowed() -> Self {
        Self::default()
    }
}

struct TermMatcher {
    term: &'static str,
    fuzzy: Regex,
}

struct CategoryRule {
    category: Category,
    terms: Vec<TermMatcher>,
}

/// Word-list classifier. Build once and share by reference.
pub struct ContentModerator {
    rules: Vec<CategoryRule>,
}

impl std::fmt::Debug for ContentModerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentModerator")
            .field("categories", &self.rules.len())
            .finish()
    }
}

/// Leetspeak substitution class for one letter.
fn letter_class(c: char) -> String {
    match c {
        'a' => "[a4@]".into(),
        'e' => "[e3]".into(),
        'i' => "[i1!|]".into(),
        'o' => "[o0]".into(),
        's' => "[s5$]".into(),
        't' => "[t7+]".into(),
        'l' => "[l1|]".into(),
        'g' => "[g9]".into(),
        'b' => "[b8]".into(),
        other => regex::escape(&other.to_string()),
    }
}

/// Build the fuzzy pattern for a term: each letter may repeat and use its
/// substitution class; spaces match any run of separators.
fn fuzzy_pattern(term: &str) -> String {
    const EDGE: &str = "[^a-z0-9@$!|+]";
    let mut body = String::new();
    for c in term.chars() {
        if c == ' ' {
            body.push_str(r"[\s_.\-]+");
        } else {
            body.push_str(&letter_class(c));
            body.push('+');
        }
    }
    format!("(?:^|{EDGE}){body}(?:$|{EDGE})")
}

impl ContentModerator {
    /// Compile the fuzzy matcher for every listed term.
    pub fn new() -> Result<Self, ModerationError> {
        let mut rules = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let mut terms = Vec::with_capacity(category.terms().len());
            for &term in category.terms() {
                let fuzzy = Regex::new(&fuzzy_pattern(term))
                    .map_err(|source| ModerationError::Pattern { term, source })?;
                terms.push(TermMatcher { term, fuzzy });
            }
            rules.push(CategoryRule { category, terms });
        }
        Ok(Self { rules })
    }

    /// Check a chat message against the most severe categories only.
    pub fn moderate_chat(&self, text: &str) -> ModerationResult {
        self.check(text, &Category::CHAT)
    }

    /// Check an image prompt against every category.
    pub fn moderate_image_prompt(&self, text: &str) -> ModerationResult {
        self.check(text, &Category::ALL)
    }

    /// Check `text` against the given categories.
    pub fn check(&self, text: &str, categories: &[Category]) -> ModerationResult {
        let normalized = normalize(text);
        let folded = fold(text);

        let mut worst: Option<Category> = None;
        let mut matched: Vec<String> = vec![];

        for rule in self.rules.iter().filter(|r| categories.contains(&r.category)) {
            for matcher in &rule.terms {
                let hit = contains_phrase(&normalized, matcher.term)
                    || matcher.fuzzy.is_match(&folded);
                if hit {
                    worst = Some(worst.map_or(rule.category, |w| w.min(rule.category)));
                    if !matched.iter().any(|m| m == matcher.term) {
                        matched.push(matcher.term.to_string());
                    }
                }
            }
        }

        if categories.contains(&Category::MinorSafety)
            && let Some((age, role)) = conjunctive_hit(&normalized)
        {
            worst = Some(Category::MinorSafety);
            for word in [age, role] {
                if !matched.iter().any(|m| m == word) {
                    matched.push(word.to_string());
                }
            }
        }

        let Some(category) = worst else {
            return ModerationResult::allowed();
        };

        tracing::debug!(category = ?category, matched = ?matched, "moderation blocked text");
        let suggestion = self.suggest(text, &matched, category);
        ModerationResult {
            is_blocked: true,
            reason: Some(category.label().to_string()),
            category: Some(category),
            matched_terms: matched,
            suggestion: Some(suggestion),
        }
    }

    fn suggest(&self, text: &str, matched: &[String], category: Category) -> String {
        // Only single-word synonyms are substituted; minor-safety blocks
        // never get a rewrite
        let replaceable = category != Category::MinorSafety
            && matched.iter().any(|m| synonym_for(m).is_some());
        if replaceable {
            let rewritten = self.sanitize(text);
            if self.check(&rewritten, &Category::ALL).is_blocked {
                category.hint().to_string()
            } else {
                format!("Try: \"{rewritten}\"")
            }
        } else {
            category.hint().to_string()
        }
    }

    /// Replace every word that has a registered synonym, keeping other words
    /// as written.
    pub fn sanitize(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|word| {
                let key = normalize(word);
                SYNONYMS
                    .iter()
                    .find(|(from, _)| *from == key)
                    .map_or_else(|| word.to_string(), |(_, to)| (*to).to_string())
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn conjunctive_hit(normalized: &str) -> Option<(&'static str, &'static str)> {
    let age = AGE_WORDS
        .iter()
        .find(|w| contains_phrase(normalized, w))?;
    let role = ROLE_WORDS
        .iter()
        .find(|w| contains_phrase(normalized, w))?;
    Some((age, role))
}
