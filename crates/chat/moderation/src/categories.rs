//! Static category word lists, synonym table and conjunctive-rule words.

use serde::{Deserialize, Serialize};

/// Moderation category, declared from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    MinorSafety,
    Sexual,
    Hate,
    Violence,
    Drugs,
}

impl Category {
    /// Every category, most severe first.
    pub const ALL: [Self; 5] = [
        Self::MinorSafety,
        Self::Sexual,
        Self::Hate,
        Self::Violence,
        Self::Drugs,
    ];

    /// The subset applied to chat messages.
    pub const CHAT: [Self; 3] = [Self::MinorSafety, Self::Sexual, Self::Hate];

    /// Human-readable label reported as the block reason.
    pub const fn label(self) -> &'static str {
        match self {
            Self::MinorSafety => "Content involving minors",
            Self::Sexual => "Sexual or explicit content",
            Self::Hate => "Hateful or extremist content",
            Self::Violence => "Graphic violence",
            Self::Drugs => "Drug-related content",
        }
    }

    /// Canned rewrite hint when no synonym applies.
    pub const fn hint(self) -> &'static str {
        match self {
            Self::MinorSafety => "Remove any reference to children or minors from this request.",
            Self::Sexual => "Try describing the scene with fully clothed subjects and no explicit detail.",
            Self::Hate => "Try rephrasing without targeting a group or referencing extremist symbols.",
            Self::Violence => "Try a dramatic or action-oriented scene without graphic injury.",
            Self::Drugs => "Try describing the setting or mood without drug use.",
        }
    }

    /// Blocked terms. Multi-word entries match as whole phrases.
    pub const fn terms(self) -> &'static [&'static str] {
        match self {
            Self::MinorSafety => &[
                "underage",
                "preteen",
                "jailbait",
                "loli",
                "lolicon",
                "shota",
                "shotacon",
                "child porn",
                "child nudity",
            ],
            Self::Sexual => &[
                "nude",
                "nudes",
                "naked",
                "nudity",
                "nsfw",
                "porn",
                "porno",
                "pornographic",
                "sex",
                "sexual",
                "erotic",
                "explicit",
                "topless",
                "hentai",
                "xxx",
                "genitals",
                "fetish",
                "striptease",
            ],
            Self::Hate => &[
                "nazi",
                "swastika",
                "genocide",
                "ethnic cleansing",
                "white power",
                "white supremacy",
                "kkk",
                "racial slur",
                "hate speech",
            ],
            Self::Violence => &[
                "gore",
                "gory",
                "murder",
                "decapitated",
                "decapitation",
                "dismembered",
                "mutilated",
                "torture",
                "massacre",
                "bloodbath",
                "beheading",
                "mass shooting",
            ],
            Self::Drugs => &[
                "cocaine",
                "heroin",
                "meth",
                "methamphetamine",
                "fentanyl",
                "crack pipe",
                "lsd",
                "overdose",
                "snorting",
            ],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Safer replacements offered as a suggestion when a matched term has one.
pub const SYNONYMS: &[(&str, &str)] = &[
    ("nude", "clothed"),
    ("nudes", "portraits"),
    ("naked", "fully clothed"),
    ("nudity", "modest attire"),
    ("topless", "wearing a shirt"),
    ("nsfw", "family-friendly"),
    ("erotic", "romantic"),
    ("explicit", "tasteful"),
    ("sexy", "elegant"),
    ("gore", "dramatic"),
    ("gory", "intense"),
    ("murder", "mystery"),
    ("massacre", "battle"),
    ("bloodbath", "showdown"),
    ("torture", "struggle"),
];

/// Look up the replacement for a normalized term.
pub fn synonym_for(term: &str) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(from, _)| *from == term)
        .map(|(_, to)| *to)
}

/// Age descriptors for the conjunctive rule.
pub const AGE_WORDS: &[&str] = &[
    "child",
    "children",
    "kid",
    "kids",
    "minor",
    "minors",
    "young girl",
    "young boy",
    "little girl",
    "little boy",
    "teen",
    "teens",
    "teenage",
    "teenager",
    "schoolgirl",
    "schoolboy",
    "toddler",
    "baby",
];

/// Clothing or role words that become blocking next to an age descriptor.
pub const ROLE_WORDS: &[&str] = &[
    "bikini",
    "lingerie",
    "underwear",
    "swimsuit",
    "sexy",
    "seductive",
    "provocative",
    "sensual",
    "revealing",
    "undressed",
    "pin up",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn all_is_sorted_by_severity() {
        let mut sorted = Category::ALL;
        sorted.sort();
        assert_eq!(sorted, Category::ALL);
        assert_eq!(&Category::ALL[..3], &Category::CHAT);
    }

    #[test]
    fn terms_are_already_normalized() {
        for category in Category::ALL {
            for term in category.terms() {
                assert_eq!(normalize(term), *term, "{category:?} term {term}");
            }
        }
        for word in AGE_WORDS.iter().chain(ROLE_WORDS) {
            assert_eq!(normalize(word), *word);
        }
    }

    #[test]
    fn synonym_lookup() {
        assert_eq!(synonym_for("naked"), Some("fully clothed"));
        assert_eq!(synonym_for("bicycle"), None);
    }
}
