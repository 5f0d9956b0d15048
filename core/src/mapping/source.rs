//! INI section trees feeding the mapping configuration

use crate::error::{RawTagsError, Result};
use ini::{Ini, ParseOption};
use std::path::Path;

/// Values are taken verbatim: `\` separates DICOM multi-values and quotes
/// belong to literals
fn parse_options() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..Default::default()
    }
}

/// One parsed configuration file
///
/// Sections and their entries keep file order. Section names are matched
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSource {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl ConfigSource {
    /// Loads an INI file
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file is missing or cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let ini = Ini::load_from_file_opt(path, parse_options())
            .map_err(|e| RawTagsError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_ini(&ini))
    }

    /// Parses INI text
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str_opt(text, parse_options())
            .map_err(|e| RawTagsError::Config(e.to_string()))?;
        Ok(Self::from_ini(&ini))
    }

    fn from_ini(ini: &Ini) -> Self {
        let sections = ini
            .iter()
            // Keys outside any section are not used by the mapping
            .filter_map(|(name, properties)| Some((name?, properties)))
            .map(|(name, properties)| {
                let entries = properties
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect();
                (name.to_string(), entries)
            })
            .collect();

        Self { sections }
    }

    /// Returns the entries of a section, or `None` if the section is absent
    pub fn section(&self, name: &str) -> Option<&[(String, String)]> {
        self.sections
            .iter()
            .find(|(section, _)| section.eq_ignore_ascii_case(name))
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }
}
