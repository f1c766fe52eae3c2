use regex::Regex;
use std::sync::LazyLock;

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Canonical fields of an entity record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityField {
    Dialogs,
    Traits,
    Voice,
}

impl EntityField {
    /// Map one of the key spellings models use onto its canonical field
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "d" | "dialogs" | "dialogue" | "dialogues" => Some(Self::Dialogs),
            "t" | "traits" | "trait" => Some(Self::Traits),
            "v" | "voice" | "voice_profile" => Some(Self::Voice),
            _ => None,
        }
    }
}

/// Comparison form of a character name: lowercase, surrounding whitespace removed
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().trim().to_string()
}

/// Comparison form of a dialog line: lowercase, punctuation removed, whitespace collapsed
pub fn normalize_dialog(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = PUNCTUATION.replace_all(lowered.trim(), "");
    WHITESPACE.replace_all(&stripped, " ").into_owned()
}

/// Lowercased prefix of at most `max_chars` characters
pub fn lowercase_prefix(text: &str, max_chars: usize) -> String {
    text.to_lowercase().chars().take(max_chars).collect()
}
