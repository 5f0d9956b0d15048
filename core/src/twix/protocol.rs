//! Typed key/value extraction from the embedded text protocol
//!
//! Protocol entries look like
//!
//! ```text
//! <ParamString."tPatientName">  { "John Doe"  }
//! <ParamDouble."flMagneticFieldStrength">  { <Precision> 6  1.494000  }
//! ```
//!
//! Each pending search entry is matched by its marker substring; the value is
//! the text between the first `{` and the next `}` after the marker, possibly
//! spanning several lines.

use super::ascconv::is_section_begin;
use super::search::{EntryType, SearchEntry, SearchSpec};
use crate::error::{RawTagsError, Result};
use log::debug;
use std::collections::BTreeMap;
use std::iter::Peekable;

/// Tag preceding the precision digits of a double entry
const PRECISION_TAG: &str = "<Precision>";

/// How a protocol scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The flat-parameter section begins at the next line
    SectionFound,
    /// The header ended without the flat-parameter section
    EndOfHeader,
}

/// Scanner owning the list of still-pending search entries
#[derive(Debug, Clone)]
pub struct ProtocolScanner {
    pending: Vec<SearchEntry>,
}

impl ProtocolScanner {
    /// Creates a scanner for one parse
    pub fn new(spec: SearchSpec) -> Self {
        Self {
            pending: spec.into_entries(),
        }
    }

    /// Entries not matched so far
    pub fn pending(&self) -> &[SearchEntry] {
        &self.pending
    }

    /// Scans lines until the flat-parameter section begins or the lines run out
    ///
    /// Captured values are inserted into `values`. Each entry is captured at
    /// most once since it leaves the pending list when matched.
    pub fn scan<I>(
        &mut self,
        lines: &mut Peekable<I>,
        values: &mut BTreeMap<String, String>,
    ) -> ScanOutcome
    where
        I: Iterator<Item = String>,
    {
        while let Some(line) = lines.next() {
            if is_section_begin(&line) {
                return ScanOutcome::SectionFound;
            }

            let Some(pos) = self
                .pending
                .iter()
                .position(|entry| line.contains(&entry.marker))
            else {
                continue;
            };

            let entry = self.pending.remove(pos);
            let after_marker = line
                .find(&entry.marker)
                .map(|start| &line[start + entry.marker.len()..])
                .unwrap_or("");

            let raw = capture_braced(after_marker, lines).unwrap_or_default();
            let value = convert_value(&raw, entry.entry_type);
            debug!("Found {} = {}", entry.id, value);
            values.insert(entry.id, value);
        }

        ScanOutcome::EndOfHeader
    }

    /// Ids of mandatory entries still pending
    pub fn missing_mandatory(&self) -> Vec<String> {
        self.pending
            .iter()
            .filter(|entry| entry.mandatory)
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Consumes the scanner, failing if mandatory entries were not found
    ///
    /// Optional entries still pending are accepted silently.
    pub fn finish(self) -> Result<()> {
        let missing = self.missing_mandatory();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RawTagsError::MissingMandatoryField(missing))
        }
    }
}

/// Returns the content between the first `{` and the following `}`
///
/// Pulls further lines while the closing brace is missing, but never consumes
/// the flat-parameter section marker.
fn capture_braced<I>(first: &str, lines: &mut Peekable<I>) -> Option<String>
where
    I: Iterator<Item = String>,
{
    let mut text = first.to_string();

    loop {
        if let Some(open) = text.find('{') {
            let inner = &text[open + 1..];
            if let Some(close) = inner.find('}') {
                return Some(inner[..close].to_string());
            }
        }

        match lines.peek() {
            Some(next) if !is_section_begin(next) => {
                text.push('\n');
                text.push_str(next);
                lines.next();
            }
            _ => return None,
        }
    }
}

/// Converts a captured value according to its declared type
pub fn convert_value(raw: &str, entry_type: EntryType) -> String {
    match entry_type {
        EntryType::String => strip_quotes(raw.trim()).to_string(),
        EntryType::Bool => {
            if raw.contains("true") {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        EntryType::Long => raw.trim().to_string(),
        EntryType::Double => strip_precision(raw).trim().to_string(),
        EntryType::Array => String::new(),
    }
}

/// Removes one layer of surrounding double quotes
pub fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Removes the `<Precision>` tag and the digit token following it
fn strip_precision(raw: &str) -> String {
    let Some(pos) = raw.find(PRECISION_TAG) else {
        return raw.to_string();
    };

    let before = &raw[..pos];
    let after = raw[pos + PRECISION_TAG.len()..].trim_start();
    let rest = match after.find(char::is_whitespace) {
        Some(end) => &after[end..],
        None => "",
    };

    format!("{}{}", before, rest)
}
