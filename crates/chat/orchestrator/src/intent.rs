//! Routes a user message to a chat turn or an image turn.
//!
//! A message is an image request when it contains both an action verb
//! ("generate", "draw") and an image noun ("image", "photo"), as whole words.

/// Which generation path a message takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Chat,
    Image,
}

const ACTION_VERBS: &[&str] = &[
    "generate", "create", "draw", "make", "paint", "render", "sketch", "design", "show",
    "produce", "illustrate",
];

const IMAGE_NOUNS: &[&str] = &[
    "image", "images", "picture", "pictures", "photo", "photos", "drawing", "painting",
    "illustration", "artwork", "art", "sketch", "portrait", "wallpaper", "logo", "pic",
];

/// Classify `text`
pub fn classify(text: &str) -> Intent {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    let has = |list: &[&str]| words.iter().any(|w| list.contains(&w.as_str()));
    if has(ACTION_VERBS) && has(IMAGE_NOUNS) {
        Intent::Image
    } else {
        Intent::Chat
    }
}
