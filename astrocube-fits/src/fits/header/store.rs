use std::collections::HashMap;

use tracing::debug;

use super::parser::{BLOCK_SIZE, RECORD_SIZE};

/// Keywords whose repeated records accumulate instead of overwriting.
pub const COMMENTARY_KEYWORDS: [&str; 2] = ["HISTORY", "COMMENT"];

const MAX_KEYWORD_LEN: usize = 8;
/// Columns 11-80 of a valued record.
const VALUE_WIDTH: usize = RECORD_SIZE - 10;
/// Columns 9-80 of a commentary record.
const COMMENTARY_WIDTH: usize = RECORD_SIZE - 8;

/// Decoded FITS header: uppercase keyword to raw value text.
///
/// Values are stored the way they appeared in the header with string quotes
/// removed. Numeric coercion happens in the typed accessors.
#[derive(Debug, Clone, Default)]
pub struct HeaderStore {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl PartialEq for HeaderStore {
    /// Content equality; insertion order is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(key, value)| other.get(key) == Some(value))
    }
}

impl HeaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_commentary(key: &str) -> bool {
        COMMENTARY_KEYWORDS.contains(&key)
    }

    /// Last write wins. The key keeps its original position.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        let key = normalize_key(key.as_ref());
        let value = value.into();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Appends to an existing value on a new line.
    pub fn append(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) {
        let key = normalize_key(key.as_ref());
        match self.index.get(&key) {
            Some(&i) => {
                let existing = &mut self.entries[i].1;
                existing.push('\n');
                existing.push_str(value.as_ref());
            }
            None => self.insert(key, value.as_ref()),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let i = self.index.remove(&normalize_key(key))?;
        let (_, value) = self.entries.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let i = *self.index.get(key).or_else(|| self.index.get(&normalize_key(key)))?;
        Some(self.entries[i].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        let raw = self.get(key)?.trim();
        raw.strip_prefix('+').unwrap_or(raw).parse().ok()
    }

    /// Accepts Fortran `D` exponents. Non-finite values count as unparseable.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        parse_float(self.get(key)?)
    }

    pub fn get_logical(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim() {
            "T" => Some(true),
            "F" => Some(false),
            _ => None,
        }
    }

    /// Sentinel variant for collaborators that treat absent and malformed alike.
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    pub fn float_or(&self, key: &str, default: f64) -> f64 {
        self.get_float(key).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serializes the store as 80-column records ending in `END`, padded to
    /// a whole block. Long strings are split over `CONTINUE` records;
    /// keywords longer than eight characters are skipped.
    pub fn to_records(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BLOCK_SIZE);

        for (key, value) in self.iter() {
            if key.len() > MAX_KEYWORD_LEN {
                debug!(keyword = key, "skipping keyword too long for a header record");
                continue;
            }
            if Self::is_commentary(key) {
                for line in value.split('\n') {
                    push_commentary(&mut out, key, line);
                }
            } else if is_bare_value(value) {
                push_record(&mut out, &format!("{:<8}= {:>20}", key, value.trim()));
            } else {
                push_string(&mut out, key, value);
            }
        }

        push_record(&mut out, "END");
        let padded = out.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        out.resize(padded, b' ');
        out
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for HeaderStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, value) in iter {
            store.insert(key, value);
        }
        store
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

pub(crate) fn parse_float(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value: f64 = if raw.contains(['D', 'd']) {
        raw.replace(['D', 'd'], "E").parse().ok()?
    } else {
        raw.parse().ok()?
    };
    value.is_finite().then_some(value)
}

fn is_bare_value(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty()
        && trimmed.len() == value.len()
        && !trimmed.contains(char::is_whitespace)
        && (trimmed == "T"
            || trimmed == "F"
            || trimmed.parse::<i64>().is_ok()
            || parse_float(trimmed).is_some())
}

fn push_record(out: &mut Vec<u8>, text: &str) {
    let mut record: Vec<u8> = text
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
        .take(RECORD_SIZE)
        .collect();
    record.resize(RECORD_SIZE, b' ');
    out.extend_from_slice(&record);
}

fn push_commentary(out: &mut Vec<u8>, key: &str, text: &str) {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        push_record(out, key);
        return;
    }
    for chunk in chars.chunks(COMMENTARY_WIDTH) {
        let chunk: String = chunk.iter().collect();
        push_record(out, &format!("{:<8}{}", key, chunk));
    }
}

/// Splits `value` into quoted pieces that fit `width` columns once escaped.
fn quoted_pieces(value: &str, first_width: usize, width: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    let mut limit = first_width;

    for c in value.trim_end().chars() {
        let cost = if c == '\'' { 2 } else { 1 };
        if used + cost > limit {
            pieces.push(std::mem::take(&mut current));
            used = 0;
            limit = width;
        }
        if c == '\'' {
            current.push_str("''");
        } else {
            current.push(c);
        }
        used += cost;
    }
    pieces.push(current);
    pieces
}

fn push_string(out: &mut Vec<u8>, key: &str, value: &str) {
    // two quotes and the continuation ampersand
    let pieces = quoted_pieces(value, VALUE_WIDTH - 3, VALUE_WIDTH - 3);
    if let [only] = pieces.as_slice() {
        if only.len() + 2 <= VALUE_WIDTH {
            push_record(out, &format!("{:<8}= '{}'", key, only));
            return;
        }
    }

    let last = pieces.len() - 1;
    for (i, piece) in pieces.iter().enumerate() {
        let amp = if i < last { "&" } else { "" };
        if i == 0 {
            push_record(out, &format!("{:<8}= '{}{}'", key, piece, amp));
        } else {
            push_record(out, &format!("CONTINUE  '{}{}'", piece, amp));
        }
    }
}
