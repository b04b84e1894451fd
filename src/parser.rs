//! Free-text WHOIS to flat `key -> value` extraction.
//!
//! No attempt is made to map registry-specific field names onto a common
//! schema. A line is a field when it looks like `key: value` where the key is
//! made of ASCII word characters, spaces and slashes.

use std::collections::HashMap;

/// Keys must be longer than this.
pub const MIN_KEY_LEN: usize = 3;
/// Keys with this many spaces or more are prose, not field names.
pub const MAX_KEY_SPACES: usize = 5;

/// Any ASCII whitespace except the line break belongs to a key, so tabs and
/// `\r` may appear inside one. Only `' '` counts toward [`MAX_KEY_SPACES`].
fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '/' || (c.is_ascii_whitespace() && c != '\n')
}

/// Split one physical line into a raw `(key, value)` at the first colon,
/// provided everything before that colon is a valid key character.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(|c: char| !is_key_char(c))?;
    if !line[colon..].starts_with(':') {
        return None;
    }
    Some((&line[..colon], &line[colon + 1..]))
}

/// Extract fields from a (possibly merged) WHOIS record.
///
/// Later occurrences of a key overwrite earlier ones. Values spanning
/// several physical lines are not joined.
pub fn parse_record(text: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();

    for line in text.split('\n') {
        let Some((raw_key, raw_value)) = split_field(line) else {
            continue;
        };

        let key = raw_key.trim().trim_matches(':').trim();
        let value = raw_value.replace('\n', "");
        let value = value.trim();

        let spaces = key.matches(' ').count();
        if key.len() >= MIN_KEY_LEN && spaces < MAX_KEY_SPACES && !value.is_empty() {
            fields.insert(key.to_string(), value.to_string());
        }
    }

    fields
}
