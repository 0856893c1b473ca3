//! Text normalization shared by exact and fuzzy matching.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Lowercase and strip diacritics (NFD, combining marks dropped). Letters
/// with no decomposition are spelled out in ASCII. Punctuation is kept so
/// leetspeak symbols survive for fuzzy matching.
pub fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bases = text.nfd().filter(|c| !is_combining_mark(*c));
    for c in bases.flat_map(char::to_lowercase) {
        match c {
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'œ' => out.push_str("oe"),
            'þ' => out.push_str("th"),
            'ø' => out.push('o'),
            'đ' | 'ð' => out.push('d'),
            'ł' => out.push('l'),
            'ı' => out.push('i'),
            other => out.push(other),
        }
    }
    out
}

/// Full normalization: [`fold`], punctuation to spaces, whitespace collapsed.
pub fn normalize(text: &str) -> String {
    fold(text)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole-word (or whole-phrase) containment on normalized text.
pub fn contains_phrase(normalized_text: &str, normalized_phrase: &str) -> bool {
    if normalized_phrase.is_empty() {
        return false;
    }
    let haystack = format!(" {normalized_text} ");
    haystack.contains(&format!(" {normalized_phrase} "))
}
