use std::collections::HashSet;

use tracing::{debug, warn};

use crate::scanner::{Token, tokens};

/// Recover an object whose closing braces were cut off.
///
/// Keeps everything up to the last entity object that closed back to depth 1
/// and re-closes the outer object there. Only the two-level shape
/// (`{"Name": {...}, ...}`) is handled.
pub fn repair_truncated(json: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut last_good = None;

    for (idx, token) in tokens(json) {
        match token {
            Token::Structural(b'{') => depth += 1,
            Token::Structural(b'}') => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    last_good = Some(idx);
                }
            }
            _ => {}
        }
    }

    let end = last_good?;
    let mut repaired = json[..=end]
        .trim_end()
        .trim_end_matches(',')
        .to_string();
    repaired.push('}');

    debug!(
        original_len = json.len(),
        repaired_len = repaired.len(),
        "Repaired truncated JSON"
    );
    Some(repaired)
}

/// Cut the object off at the first top-level key that repeats (case-insensitively).
///
/// A repeated character name means the model started looping; everything from
/// the repeat onwards is dropped and the first occurrence is kept.
pub fn truncate_at_duplicate_key(json: &str) -> String {
    let mut seen: HashSet<String> = HashSet::new();
    let mut depth = 0usize;
    let mut key_start = None;
    let mut current_key: Option<(usize, &str)> = None;
    let mut last_comma = None;
    let mut last_entity_end = None;

    for (idx, token) in tokens(json) {
        match token {
            Token::QuoteOpen if depth == 1 => key_start = Some(idx),
            Token::QuoteClose if depth == 1 => {
                if let Some(start) = key_start.take() {
                    current_key = Some((start, &json[start + 1..idx]));
                }
            }
            Token::Structural(b',') if depth == 1 => last_comma = Some(idx),
            Token::Structural(b'{') => {
                depth += 1;
                if depth != 2 {
                    continue;
                }
                let Some((quote_pos, key)) = current_key.filter(|(_, k)| !k.is_empty()) else {
                    continue;
                };
                if !seen.insert(key.to_lowercase()) {
                    // Without a separating comma, cut right before the key itself
                    let cut = last_comma.unwrap_or(quote_pos);
                    warn!(key, position = idx, "Duplicate key in model output, truncating");
                    let mut truncated = json[..cut].trim_end().to_string();
                    truncated.push('}');
                    return truncated;
                }
            }
            Token::Structural(b'}') => {
                if depth == 2 {
                    last_entity_end = Some(idx);
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    match last_entity_end {
        Some(end) if !json.trim_end().ends_with('}') => {
            debug!(position = end, "Closing object after last complete entity");
            format!("{}}}", &json[..=end])
        }
        _ => json.to_string(),
    }
}
