//! Flat `key = value` acquisition parameters of the ASCCONV section

use super::protocol::strip_quotes;
use log::debug;
use std::collections::BTreeMap;

/// Known spellings of the section-begin marker
pub const SECTION_BEGIN_MARKERS: [&str; 2] = ["### ASCCONV BEGIN ###", "### ASCCONV BEGIN object="];

/// Section-end marker
pub const SECTION_END_MARKER: &str = "### ASCCONV END ###";

/// Namespace prefix of all flat parameters in the value store
pub const MRPROT_PREFIX: &str = "mrprot.";

/// Legacy key prefixes and their modern spelling
const LEGACY_KEY_PREFIXES: [(&str, &str); 1] = [("sWiPMemBlock", "sWipMemBlock")];

/// Returns true if the line opens the flat-parameter section
pub fn is_section_begin(line: &str) -> bool {
    SECTION_BEGIN_MARKERS
        .iter()
        .any(|marker| line.contains(marker))
}

/// Parses one `key = value` line into a namespaced key and value
///
/// Returns `None` if the line has no `=`.
pub fn parse_line(line: &str) -> Option<(String, String)> {
    let line: String = line.chars().filter(|&c| c != '\t').collect();
    let (raw_key, raw_value) = line.split_once('=')?;

    let key: String = raw_key.trim().chars().filter(|&c| c != ' ').collect();
    let key = canonical_key(&key);

    let value = raw_value.trim_start_matches(' ').trim_end();
    let value = strip_quotes(value);

    Some((format!("{}{}", MRPROT_PREFIX, key), value.to_string()))
}

/// Rewrites legacy vendor key prefixes to the modern spelling
fn canonical_key(key: &str) -> String {
    for (legacy, modern) in LEGACY_KEY_PREFIXES {
        if let Some(rest) = key.strip_prefix(legacy) {
            return format!("{}{}", modern, rest);
        }
    }
    key.to_string()
}

/// Reads lines until the section-end marker, inserting all parameters
///
/// Returns `true` if the end marker was seen before the lines ran out.
pub fn parse_section<I>(lines: &mut I, values: &mut BTreeMap<String, String>) -> bool
where
    I: Iterator<Item = String>,
{
    for line in lines {
        if line.contains(SECTION_END_MARKER) {
            return true;
        }

        match parse_line(&line) {
            Some((key, value)) => {
                values.insert(key, value);
            }
            None => {
                if !line.trim().is_empty() {
                    debug!("Skipping ASCCONV line without assignment: {}", line);
                }
            }
        }
    }

    false
}
