//! Prompt enhancement: strip a leading request phrase, append a quality phrase.

use rand::Rng;
use rand::seq::SliceRandom;

/// Request phrases removed from the start of a prompt, longest first
pub const TRIGGER_PHRASES: &[&str] = &[
    "please generate me a picture of",
    "please generate an image of",
    "can you generate an image of",
    "can you draw me a picture of",
    "generate me a picture of",
    "generate me an image of",
    "create me a picture of",
    "create me an image of",
    "generate a picture of",
    "generate an image of",
    "create a picture of",
    "create an image of",
    "make a picture of",
    "make an image of",
    "draw me a picture of",
    "draw a picture of",
    "generate a photo of",
    "create a photo of",
    "draw me",
    "paint me",
    "show me",
    "generate",
    "draw",
];

/// Quality phrases; exactly one is appended
pub const QUALITY_PHRASES: &[&str] = &[
    "highly detailed, sharp focus",
    "professional photography, 8k resolution",
    "cinematic lighting, ultra detailed",
    "masterpiece, best quality",
    "vibrant colors, intricate details",
    "studio lighting, high resolution",
];

/// Remove the longest matching trigger phrase from the head of `prompt`
///
/// Matching is ASCII case-insensitive and only succeeds on a word boundary.
#[must_use]
pub fn strip_trigger(prompt: &str) -> &str {
    let trimmed = prompt.trim();
    for phrase in TRIGGER_PHRASES {
        if let Some((head, rest)) = trimmed.split_at_checked(phrase.len())
            && head.eq_ignore_ascii_case(phrase)
            && (rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == ':' || c == ','))
        {
            let remainder = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ':' || c == ',');
            if !remainder.is_empty() {
                return remainder;
            }
        }
    }
    trimmed
}

/// Strip a trigger phrase and append one quality phrase chosen by `rng`
pub fn enhance_prompt<R: Rng + ?Sized>(prompt: &str, rng: &mut R) -> String {
    let subject = strip_trigger(prompt).trim_end_matches(['.', ',', ' ']);
    let quality = QUALITY_PHRASES
        .choose(rng)
        .copied()
        .unwrap_or(QUALITY_PHRASES[0]);
    format!("{subject}, {quality}")
}
