//! Best-effort parsing of raw model output.
//!
//! Nothing here returns an error: every stage degrades to whatever the
//! earlier stages recovered, and the worst case is an empty result.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::entities::EntityMap;
use crate::normalizer::{EntityField, lowercase_prefix};
use crate::repair::{repair_truncated, truncate_at_duplicate_key};
use crate::scanner::balanced_span;
use crate::schema::{DialogAttribution, EntityRecord};

/// Dialog dedup compares only this many leading characters of the line
const DIALOG_DEDUP_PREFIX: usize = 50;
const UNKNOWN_SPEAKER: &str = "Unknown";

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think block pattern"));
static THINK_UNCLOSED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*").expect("unclosed think pattern"));
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("code fence pattern"));
static ENTITY_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]+)":\s*(\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\})"#).expect("entity segment pattern")
});
static SHALLOW_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("shallow object pattern")
});
static DIALOG_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\s*"speaker"\s*:\s*"([^"]+)"\s*,\s*"text"\s*:\s*"([^"]+)"\s*\}"#)
        .expect("dialog pair pattern")
});

/// Remove `<think>` reasoning blocks and `/no_think` markers
pub fn strip_reasoning(text: &str) -> String {
    let without_blocks = THINK_BLOCK.replace_all(text, "");
    let without_open = THINK_UNCLOSED.replace_all(&without_blocks, "");
    without_open.replace("/no_think", "")
}

/// Content of the first fenced code block, or the text itself
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text,
    }
}

fn working_text(raw: &str) -> String {
    let cleaned = strip_reasoning(raw);
    strip_code_fence(cleaned.trim()).to_string()
}

/// Locate the JSON candidate in `text`: the first `{...}` or `[...]` span,
/// whichever opens first, with truncated objects repaired.
fn locate_candidate(text: &str) -> Option<String> {
    let (start, open, close) = match (text.find('{'), text.find('[')) {
        (Some(obj), Some(arr)) if arr < obj => (arr, b'[', b']'),
        (Some(obj), _) => (obj, b'{', b'}'),
        (None, Some(arr)) => (arr, b'[', b']'),
        (None, None) => return None,
    };

    if let Some(span) = balanced_span(text, start, open, close) {
        return Some(span.to_string());
    }
    if open == b'{' {
        return repair_truncated(&text[start..]);
    }
    None
}

/// Extract the JSON text a model response most likely meant to produce
pub fn extract_json(raw: &str) -> Option<String> {
    locate_candidate(&working_text(raw))
}

/// Parse a batched analysis response of the shape
/// `{"Name": {"D": [...], "T": [...], "V": "..."}, ...}`.
pub fn parse_entities(raw: &str) -> EntityMap {
    let cleaned = strip_reasoning(raw);
    let text = strip_code_fence(cleaned.trim());

    // An unbalanced array may still hold a repairable object, and a fence
    // may hold prose while the object follows it
    let candidate = locate_candidate(text)
        .or_else(|| repair_from_first_object(text))
        .or_else(|| repair_from_first_object(&cleaned));

    let entities = match candidate {
        Some(candidate) => decode_entities(&candidate),
        None => {
            warn!(response_len = raw.len(), "No JSON found in model output");
            EntityMap::new()
        }
    };
    if !entities.is_empty() {
        return entities;
    }

    let merged = decode_object_stream(&cleaned);
    if !merged.is_empty() {
        debug!(entities = merged.len(), "Recovered entities from standalone objects");
    }
    merged
}

fn repair_from_first_object(text: &str) -> Option<String> {
    text.find('{').and_then(|start| repair_truncated(&text[start..]))
}

fn decode_entities(candidate: &str) -> EntityMap {
    let json = truncate_at_duplicate_key(candidate);

    match serde_json::from_str::<Value>(&json) {
        Ok(Value::Object(map)) => entities_from_object(map),
        Ok(_) => EntityMap::new(),
        Err(e) => {
            debug!(error = %e, "Decode failed, falling back to per-entity segments");
            decode_segments(&json)
        }
    }
}

/// Decode each `"Name": {...}` segment on its own, skipping broken ones.
///
/// Repeats are normally cut by `truncate_at_duplicate_key` first; the name
/// check here still keeps the first segment when text reaches this directly.
fn decode_segments(json: &str) -> EntityMap {
    let mut seen = HashSet::new();
    let mut entities = EntityMap::new();

    for caps in ENTITY_SEGMENT.captures_iter(json) {
        let name = &caps[1];
        if !seen.insert(name.to_lowercase()) {
            continue;
        }
        match serde_json::from_str::<Value>(&caps[2]) {
            Ok(Value::Object(fields)) => {
                entities.insert(normalize_record(name, fields));
            }
            _ => {
                debug!(name, "Skipping undecodable entity segment");
            }
        }
    }

    entities
}

/// Merge every standalone object in the response (JSON-lines style output)
fn decode_object_stream(raw: &str) -> EntityMap {
    let mut entities = EntityMap::new();

    for m in SHALLOW_OBJECT.find_iter(raw) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(m.as_str()) {
            entities.extend(entities_from_object(map));
        }
    }

    entities
}

fn entities_from_object(map: Map<String, Value>) -> EntityMap {
    let mut entities = EntityMap::new();
    for (name, value) in map {
        if let Value::Object(fields) = value {
            entities.insert(normalize_record(&name, fields));
        }
    }
    entities
}

fn normalize_record(name: &str, fields: Map<String, Value>) -> EntityRecord {
    let mut record = EntityRecord::new(name);

    for (key, value) in fields {
        match (EntityField::from_key(&key), value) {
            (Some(EntityField::Dialogs), Value::Array(items)) => record.dialogs = strings(items),
            (Some(EntityField::Traits), Value::Array(items)) => record.traits = strings(items),
            (Some(EntityField::Voice), Value::String(voice)) => record.voice_encoding = voice,
            _ => {}
        }
    }

    record
}

fn strings(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// Decode JSON string escapes in a regex capture, keeping it verbatim if they are invalid
fn unescape(captured: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{captured}\""))
        .unwrap_or_else(|_| captured.to_string())
}

/// Parse a flat `[{"speaker": "...", "text": "..."}]` dialog response.
///
/// Pairs are matched directly so truncated arrays still yield every complete
/// entry. Repeats with the same speaker and the same opening text are dropped.
pub fn parse_dialog_list(raw: &str) -> Vec<DialogAttribution> {
    let mut dedup = DialogDedup::default();

    for caps in DIALOG_PAIR.captures_iter(raw) {
        dedup.push(DialogAttribution::new(unescape(&caps[1]), unescape(&caps[2])));
    }

    if !dedup.is_empty() {
        debug!(dialogs = dedup.dialogs.len(), "Extracted dialogs by pattern");
        return dedup.dialogs;
    }

    let Some(json) = extract_json(raw) else {
        return Vec::new();
    };
    let entries = match serde_json::from_str::<Value>(&json) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(mut map)) => match map.remove("dialogs") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    for entry in entries {
        let Value::Object(fields) = entry else {
            continue;
        };
        let Some(text) = fields.get("text").and_then(Value::as_str) else {
            continue;
        };
        let speaker = fields
            .get("speaker")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_SPEAKER);
        dedup.push(DialogAttribution::new(speaker, text));
    }

    dedup.dialogs
}

#[derive(Default)]
struct DialogDedup {
    seen: HashSet<(String, String)>,
    dialogs: Vec<DialogAttribution>,
}

impl DialogDedup {
    fn push(&mut self, dialog: DialogAttribution) {
        let key = (
            dialog.speaker.to_lowercase(),
            lowercase_prefix(&dialog.text, DIALOG_DEDUP_PREFIX),
        );
        if self.seen.insert(key) {
            self.dialogs.push(dialog);
        }
    }

    fn is_empty(&self) -> bool {
        self.dialogs.is_empty()
    }
}

/// Parse a character-list response: `{"characters": [...]}` or a bare array
pub fn parse_character_list(raw: &str) -> Vec<String> {
    let Some(json) = extract_json(raw) else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(&json) {
        Ok(Value::Object(mut map)) => match map.remove("characters") {
            Some(Value::Array(items)) => strings(items),
            _ => Vec::new(),
        },
        Ok(Value::Array(items)) => strings(items),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ENTITIES: &str = r#"{"Mira": {"D": ["Stop right there."], "T": ["stern"], "V": "female,young,neutral,1.1,1.0"}, "Jax": {"D": ["I am not afraid!", "Run!"], "T": ["brave"], "V": "male,young,american,0.9,1.3"}}"#;

    #[test]
    fn test_no_delimiters() {
        assert!(parse_entities("").is_empty());
        assert!(parse_entities("The model refused to answer.").is_empty());
        assert!(parse_dialog_list("nothing here").is_empty());
        assert!(parse_character_list("nobody").is_empty());
    }

    #[test]
    fn test_fenced_scenario() {
        let raw = "Here you go:\n```json\n{\"Mira\": {\"D\": [\"Stop right there.\"], \"T\": [\"stern\"], \"V\": \"female,young,neutral,1.1,1.0\"}}\n```";
        let entities = parse_entities(raw);

        assert_eq!(entities.len(), 1);
        let mira = entities.get("Mira").unwrap();
        assert_eq!(mira.dialogs, vec!["Stop right there."]);
        assert_eq!(mira.traits, vec!["stern"]);
        assert_eq!(mira.voice_encoding, "female,young,neutral,1.1,1.0");
    }

    #[test]
    fn test_valid_object_round_trips() {
        let entities = parse_entities(TWO_ENTITIES);

        assert_eq!(entities.names(), vec!["Mira", "Jax"]);
        let jax = entities.get("Jax").unwrap();
        assert_eq!(jax.dialogs, vec!["I am not afraid!", "Run!"]);
        assert_eq!(jax.traits, vec!["brave"]);
        assert_eq!(jax.voice_encoding, "male,young,american,0.9,1.3");
    }

    #[test]
    fn test_fence_is_transparent() {
        let fenced = format!("```json\n{TWO_ENTITIES}\n```");
        let untagged = format!("Sure!\n```\n{TWO_ENTITIES}\n```\nLet me know.");

        assert_eq!(parse_entities(&fenced), parse_entities(TWO_ENTITIES));
        assert_eq!(parse_entities(&untagged), parse_entities(TWO_ENTITIES));
    }

    #[test]
    fn test_truncated_anywhere_in_second_entity() {
        let first_end = TWO_ENTITIES.find("}, \"Jax\"").unwrap() + 1;
        let second_end = TWO_ENTITIES.len() - 1;

        for cut in (first_end..second_end).filter(|&i| TWO_ENTITIES.is_char_boundary(i)) {
            let entities = parse_entities(&TWO_ENTITIES[..cut]);
            assert_eq!(entities.names(), vec!["Mira"], "cut at {cut}");
            assert_eq!(entities.get("Mira").unwrap().traits, vec!["stern"]);
        }
    }

    #[test]
    fn test_duplicate_key_scenario() {
        let entities = parse_entities(r#"{"X": {"D": ["hi"]}, "X": {"D": ["bye"]}}"#);

        assert_eq!(entities.len(), 1);
        assert_eq!(entities.get("X").unwrap().dialogs, vec!["hi"]);
    }

    #[test]
    fn test_duplicate_key_keeps_first_and_others() {
        let raw = r#"{"A": {"T": ["first"]}, "B": {"T": ["b"]}, "A": {"T": ["second"]}, "C": {"T": ["c"]}}"#;
        let entities = parse_entities(raw);

        assert_eq!(entities.names(), vec!["A", "B"]);
        assert_eq!(entities.get("A").unwrap().traits, vec!["first"]);
    }

    #[test]
    fn test_key_synonyms_and_unknown_keys() {
        let raw = r#"{"Mira": {"dialogue": ["Hi."], "Trait": ["calm"], "voice_profile": "female,adult", "mood": "happy"}}"#;
        let mira = parse_entities(raw).get("Mira").cloned().unwrap();

        assert_eq!(mira.dialogs, vec!["Hi."]);
        assert_eq!(mira.traits, vec!["calm"]);
        assert_eq!(mira.voice_encoding, "female,adult");
    }

    #[test]
    fn test_wrong_typed_values_dropped() {
        let raw = r#"{"Mira": {"D": "not a list", "T": ["calm", 3, null], "V": 1.0}, "Narrator": "text"}"#;
        let entities = parse_entities(raw);

        assert_eq!(entities.names(), vec!["Mira"]);
        let mira = entities.get("Mira").unwrap();
        assert!(mira.dialogs.is_empty());
        assert_eq!(mira.traits, vec!["calm"]);
        assert!(mira.voice_encoding.is_empty());
    }

    #[test]
    fn test_segment_fallback_skips_broken_entity() {
        let raw = r#"{"A": {"D": ["ok"]}, "B": {"D": [oops]}, "C": {"D": ["fine"]}}"#;
        let entities = parse_entities(raw);

        assert_eq!(entities.names(), vec!["A", "C"]);
    }

    #[test]
    fn test_reasoning_block_is_ignored() {
        let raw = "<think>Maybe {\"Wrong\": {\"D\": []}}?</think>\n{\"Mira\": {\"D\": [\"Hello.\"]}}";
        let entities = parse_entities(raw);

        assert_eq!(entities.names(), vec!["Mira"]);
    }

    #[test]
    fn test_reasoning_block_stays_out_of_object_fallback() {
        let raw = "<think>{\"Wrong\": {\"D\": [\"x\"]}}</think>\n{\"Mira\": {\"D\": [oops]}}";
        let entities = parse_entities(raw);

        assert!(!entities.contains("Wrong"));
        assert!(entities.is_empty());
    }

    #[test]
    fn test_object_after_prose_fence() {
        let raw = "```\nNote: names below\n```\n{\"Mira\": {\"D\": [\"Hi\"]}}";
        let entities = parse_entities(raw);

        assert_eq!(entities.names(), vec!["Mira"]);
        assert_eq!(entities.get("Mira").unwrap().dialogs, vec!["Hi"]);
    }

    #[test]
    fn test_segments_keep_first_repeat() {
        let json = r#"{"Mira": {"D": ["a"]}, "MIRA": {"D": ["b"]}, "Jax": {"D": [oops]}}"#;
        let entities = decode_segments(json);

        assert_eq!(entities.names(), vec!["Mira"]);
        assert_eq!(entities.get("Mira").unwrap().dialogs, vec!["a"]);
    }

    #[test]
    fn test_json_lines_output() {
        let raw = "[\n{\"Mira\": {\"D\": [\"One.\"]}}\n{\"Jax\": {\"D\": [\"Two.\"]}}\n{\"mira\": {\"D\": [\"Three.\"]}}";
        let entities = parse_entities(raw);

        assert_eq!(entities.names(), vec!["Mira", "Jax"]);
        assert_eq!(entities.get("Mira").unwrap().dialogs, vec!["One."]);
    }

    #[test]
    fn test_array_wrapped_object() {
        let entities = parse_entities(r#"[{"Mira": {"D": ["One."]}}]"#);

        assert_eq!(entities.names(), vec!["Mira"]);
    }

    #[test]
    fn test_dialog_list_dedup() {
        let raw = r#"[{"speaker": "Jax", "text": "I am not afraid!"}, {"speaker": "jax", "text": "I AM NOT AFRAID!"}, {"speaker": "Mira", "text": "Stop \"now\"."}, {"speaker": "Mira", "text": "Go"#;
        let dialogs = parse_dialog_list(raw);

        assert_eq!(
            dialogs,
            vec![DialogAttribution::new("Jax", "I am not afraid!")]
        );
    }

    #[test]
    fn test_dialog_list_decodes_escapes() {
        let raw = r#"[{"speaker": "Mira", "text": "Line one\nline two"}]"#;
        let dialogs = parse_dialog_list(raw);

        assert_eq!(dialogs[0].text, "Line one\nline two");
    }

    #[test]
    fn test_dialog_list_fallback_decode() {
        let raw = r#"{"dialogs": [{"text": "Who's there?", "speaker": "Mira"}, {"text": "Only me."}, {"speaker": "Jax"}]}"#;
        let dialogs = parse_dialog_list(raw);

        assert_eq!(
            dialogs,
            vec![
                DialogAttribution::new("Mira", "Who's there?"),
                DialogAttribution::new("Unknown", "Only me."),
            ]
        );
    }

    #[test]
    fn test_character_list() {
        assert_eq!(
            parse_character_list(r#"Characters: {"characters": ["Mira", "Jax"]}"#),
            vec!["Mira", "Jax"]
        );
        assert_eq!(parse_character_list(r#"["Mira", 7, "Jax"]"#), vec!["Mira", "Jax"]);
        assert!(parse_character_list(r#"{"names": ["Mira"]}"#).is_empty());
    }

    #[test]
    fn test_extract_json_prefers_first_delimiter() {
        assert_eq!(extract_json(r#"a [1, {"b": 2}] c"#).unwrap(), r#"[1, {"b": 2}]"#);
        assert_eq!(extract_json(r#"a {"b": [1]} [2]"#).unwrap(), r#"{"b": [1]}"#);
        assert!(extract_json("[1, 2").is_none());
    }
}
