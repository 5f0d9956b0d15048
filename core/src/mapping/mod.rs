//! Two-tier configurable tag mapping
//!
//! The GLOBAL tier starts from the built-in defaults and is overlaid with the
//! `SetDCMTags` sections of the mode and dynamic files. For every series a
//! CURRENT tier is copied from GLOBAL and overlaid with the
//! `SetDCMTags_Series{n}` sections. Later sources override equal keys.

pub mod defaults;
pub mod source;
pub mod tags;

pub use source::ConfigSource;

use crate::evaluation::MappingExpression;
use dicom_core::Tag;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::Path;
use tags::{format_tag_path, parse_tag_path};

/// Section holding the global settings
pub const GLOBAL_SECTION: &str = "SetDCMTags";

/// Prefix of the per-series sections, followed by the 1-based series number
pub const SERIES_SECTION_PREFIX: &str = "SetDCMTags_Series";

pub const OPTION_CLEAR_DEFAULTS: &str = "ClearDefaults";
pub const OPTION_COLOR: &str = "Color";
pub const OPTION_SERIES_MODE: &str = "SeriesMode";
pub const OPTION_SERIES_OFFSET: &str = "SeriesOffset";
pub const OPTION_FRAME_DURATION: &str = "FrameDuration";

/// Tag path → mapping expression
pub type TagMap = BTreeMap<Tag, MappingExpression>;

/// Free-form directive key → value
pub type OptionsMap = BTreeMap<String, String>;

/// One tier of the mapping: tag assignments plus options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTier {
    pub tags: TagMap,
    pub options: OptionsMap,
}

impl MappingTier {
    /// Tier holding the built-in default mapping
    pub fn with_defaults() -> Self {
        let mut tier = Self::default();
        tier.insert_all(&defaults::default_mapping());
        tier
    }

    /// Looks up an option, ignoring key case
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Checks an option value, ignoring case of key and value
    pub fn option_is(&self, key: &str, expected: &str) -> bool {
        self.option(key)
            .map(|v| v.trim().eq_ignore_ascii_case(expected))
            .unwrap_or(false)
    }

    /// Whether `Color=TRUE` is set
    pub fn is_color(&self) -> bool {
        self.option_is(OPTION_COLOR, "TRUE")
    }

    /// Whether `SeriesMode=TIME` is set
    pub fn is_time_series(&self) -> bool {
        self.option_is(OPTION_SERIES_MODE, "TIME")
    }

    /// Offset added to the series number variable
    pub fn series_offset(&self) -> i64 {
        self.option(OPTION_SERIES_OFFSET)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Configured frame duration in seconds
    pub fn frame_duration(&self) -> Option<f64> {
        self.option(OPTION_FRAME_DURATION)
            .and_then(|v| v.trim().parse().ok())
    }

    /// Routes one configuration entry to the tag table or the options
    fn apply_entry(&mut self, key: &str, value: &str) {
        let key = key.trim();

        if key.starts_with('(') {
            match parse_tag_path(key) {
                Some(tag) => {
                    self.tags.insert(tag, MappingExpression::parse(value));
                }
                None => warn!("Ignoring invalid tag path {}", key),
            }
        } else if key.eq_ignore_ascii_case(OPTION_CLEAR_DEFAULTS) {
            if value.trim().eq_ignore_ascii_case("TRUE") {
                debug!("Clearing inherited tag mapping");
                self.tags.clear();
            }
        } else {
            self.options.retain(|k, _| !k.eq_ignore_ascii_case(key));
            self.options.insert(key.to_string(), value.to_string());
        }
    }

    /// Applies all entries of a section in order
    fn overlay(&mut self, entries: &[(String, String)]) {
        for (key, value) in entries {
            self.apply_entry(key, value);
        }
    }

    fn insert_all(&mut self, mapping: &[(Tag, &str)]) {
        for (tag, value) in mapping {
            self.tags.insert(*tag, MappingExpression::parse(value));
        }
    }
}

/// Resolver building the GLOBAL and per-series CURRENT mapping tiers
#[derive(Debug, Clone)]
pub struct TagMapping {
    mode: Option<ConfigSource>,
    dynamic: Option<ConfigSource>,
    global: MappingTier,
    current: MappingTier,
}

impl Default for TagMapping {
    fn default() -> Self {
        Self::new()
    }
}

impl TagMapping {
    /// Creates a resolver holding only the default mapping
    pub fn new() -> Self {
        let global = MappingTier::with_defaults();
        Self {
            mode: None,
            dynamic: None,
            current: global.clone(),
            global,
        }
    }

    /// Creates a resolver from already loaded sources
    pub fn with_sources(mode: Option<ConfigSource>, dynamic: Option<ConfigSource>) -> Self {
        Self {
            mode,
            dynamic,
            ..Self::new()
        }
    }

    /// Loads the optional mode and dynamic files
    ///
    /// A file that cannot be read is logged and ignored; the defaults stay in place.
    pub fn read_configuration(&mut self, mode_file: Option<&Path>, dynamic_file: Option<&Path>) {
        self.mode = mode_file.and_then(|path| load_source(path, "mode"));
        self.dynamic = dynamic_file.and_then(|path| load_source(path, "dynamic settings"));
    }

    /// Overlays the global sections of mode and dynamic files onto GLOBAL
    pub fn setup_global_configuration(&mut self) {
        for source in self.mode.iter().chain(self.dynamic.iter()) {
            match source.section(GLOBAL_SECTION) {
                Some(entries) => self.global.overlay(entries),
                None => debug!("Section {} not defined", GLOBAL_SECTION),
            }
        }
    }

    /// Builds CURRENT for a 1-based series number and returns it
    pub fn setup_series_configuration(&mut self, series: u32) -> &MappingTier {
        let mut current = self.global.clone();
        let section_name = format!("{}{}", SERIES_SECTION_PREFIX, series);

        for source in self.mode.iter().chain(self.dynamic.iter()) {
            if let Some(entries) = source.section(&section_name) {
                current.overlay(entries);
            }
        }

        evaluate_series_options(&mut current);
        info!(
            "Series {}: {} tag assignments, {} options",
            series,
            current.tags.len(),
            current.options.len()
        );
        for (tag, expr) in &current.tags {
            debug!("  {} = {}", format_tag_path(*tag), expr);
        }

        self.current = current;
        &self.current
    }

    pub fn global(&self) -> &MappingTier {
        &self.global
    }

    pub fn current(&self) -> &MappingTier {
        &self.current
    }
}

/// Expands the built-in option macros into tag overrides
fn evaluate_series_options(tier: &mut MappingTier) {
    if tier.is_color() {
        debug!("Color mode: switching to RGB");
        tier.insert_all(&defaults::color_mapping());
    }

    if tier.is_time_series() {
        debug!("Series mode TIME: mapping as dynamic time series");
        tier.insert_all(&defaults::time_series_mapping());
    }
}

fn load_source(path: &Path, kind: &str) -> Option<ConfigSource> {
    match ConfigSource::from_file(path) {
        Ok(source) => Some(source),
        Err(e) => {
            warn!("Unable to read {} file {} -- {}", kind, path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::tags::{
        ACCESSION_NUMBER, IMAGE_TYPE, INSTITUTION_NAME, PATIENT_NAME, PHOTOMETRIC_INTERPRETATION,
        SAMPLES_PER_PIXEL, SERIES_DESCRIPTION,
    };

    fn source(text: &str) -> ConfigSource {
        ConfigSource::from_ini_str(text).unwrap()
    }

    #[test]
    fn test_defaults_without_configuration() {
        let mut mapping = TagMapping::new();
        mapping.read_configuration(None, None);
        mapping.setup_global_configuration();
        let defaults = defaults::default_mapping().len();
        assert_eq!(mapping.global().tags.len(), defaults);
        assert_eq!(mapping.setup_series_configuration(1).tags.len(), defaults);
    }

    #[test]
    fn test_unreadable_files_keep_defaults() {
        let mut mapping = TagMapping::new();
        mapping.read_configuration(
            Some(Path::new("/nonexistent/mode.ini")),
            Some(Path::new("/nonexistent/dyn.ini")),
        );
        mapping.setup_global_configuration();
        assert_eq!(
            mapping.global().tags.len(),
            defaults::default_mapping().len()
        );
    }

    #[test]
    fn test_global_routing_and_override_order() {
        let mode = source("[SetDCMTags]\n(0008,0080)=Mode Clinic\nSeriesOffset=100\n");
        let dynamic = source("[SetDCMTags]\n(0008,0080)=Dynamic Clinic\n");
        let mut mapping = TagMapping::with_sources(Some(mode), Some(dynamic));
        mapping.setup_global_configuration();

        assert_eq!(
            mapping.global().tags[&INSTITUTION_NAME],
            MappingExpression::literal("Dynamic Clinic")
        );
        assert_eq!(mapping.global().option("seriesoffset"), Some("100"));
        assert_eq!(mapping.global().series_offset(), 100);
    }

    #[test]
    fn test_configured_values_reach_the_mapping_verbatim() {
        let mode = source(
            "[SetDCMTags]\n(0008,0008)=DERIVED\\SECONDARY\\OTHER\n(0008,0050)=#keep\n\
             (0008,103E)=#protname_time\n",
        );
        let mut mapping = TagMapping::with_sources(Some(mode), None);
        mapping.setup_global_configuration();
        let tags = &mapping.global().tags;

        assert_eq!(
            tags[&IMAGE_TYPE],
            MappingExpression::literal("DERIVED\\SECONDARY\\OTHER")
        );
        assert_eq!(
            tags[&ACCESSION_NUMBER],
            MappingExpression::VarRef("keep".to_string())
        );
        assert_eq!(
            tags[&SERIES_DESCRIPTION],
            MappingExpression::VarRef("protname_time".to_string())
        );
    }

    #[test]
    fn test_series_overlay_order() {
        let mode = source(
            "[SetDCMTags]\n(0010,0010)=global-mode\n[SetDCMTags_Series1]\n(0010,0010)=series-mode\n",
        );
        let dynamic = source("[SetDCMTags_Series1]\n(0010,0010)=series-dynamic\n");
        let mut mapping = TagMapping::with_sources(Some(mode), Some(dynamic));
        mapping.setup_global_configuration();

        let current = mapping.setup_series_configuration(1);
        assert_eq!(
            current.tags[&PATIENT_NAME],
            MappingExpression::literal("series-dynamic")
        );
        let current = mapping.setup_series_configuration(2);
        assert_eq!(
            current.tags[&PATIENT_NAME],
            MappingExpression::literal("global-mode")
        );
    }

    #[test]
    fn test_clear_defaults_only_affects_its_series() {
        let mode = source(
            "[SetDCMTags_Series2]\n(0008,0080)=Before\nClearDefaults=TRUE\n(0008,103E)=Only\n",
        );
        let mut mapping = TagMapping::with_sources(Some(mode), None);
        mapping.setup_global_configuration();
        let defaults = defaults::default_mapping().len();

        assert_eq!(mapping.setup_series_configuration(1).tags.len(), defaults);

        let series2 = mapping.setup_series_configuration(2);
        assert_eq!(series2.tags.len(), 1);
        assert_eq!(
            series2.tags[&SERIES_DESCRIPTION],
            MappingExpression::literal("Only")
        );
        assert!(series2.option(OPTION_CLEAR_DEFAULTS).is_none());

        assert_eq!(mapping.setup_series_configuration(3).tags.len(), defaults);
        assert_eq!(mapping.global().tags.len(), defaults);
    }

    #[test]
    fn test_clear_defaults_in_mode_applies_before_dynamic() {
        let mode = source("[SetDCMTags_Series1]\nClearDefaults=true\n");
        let dynamic = source("[SetDCMTags_Series1]\n(0010,0010)=@PatientName\n");
        let mut mapping = TagMapping::with_sources(Some(mode), Some(dynamic));
        mapping.setup_global_configuration();
        let current = mapping.setup_series_configuration(1);
        assert_eq!(current.tags.len(), 1);
        assert!(current.tags.contains_key(&PATIENT_NAME));
    }

    #[test]
    fn test_color_option_injects_rgb_tags() {
        let mode = source("[SetDCMTags_Series2]\nColor=true\n");
        let mut mapping = TagMapping::with_sources(Some(mode), None);
        mapping.setup_global_configuration();

        let series2 = mapping.setup_series_configuration(2);
        assert_eq!(
            series2.tags[&PHOTOMETRIC_INTERPRETATION],
            MappingExpression::literal("RGB")
        );
        assert_eq!(
            series2.tags[&SAMPLES_PER_PIXEL],
            MappingExpression::literal("3")
        );

        let series1 = mapping.setup_series_configuration(1);
        assert!(!series1.tags.contains_key(&PHOTOMETRIC_INTERPRETATION));
    }

    #[test]
    fn test_time_series_option() {
        let mode = source("[SetDCMTags]\nSeriesMode=time\n");
        let mut mapping = TagMapping::with_sources(Some(mode), None);
        mapping.setup_global_configuration();
        let current = mapping.setup_series_configuration(1);
        assert!(current.is_time_series());
        assert_eq!(
            current.tags[&SERIES_DESCRIPTION],
            MappingExpression::VarRef("protname_time".to_string())
        );
    }

    #[test]
    fn test_invalid_tag_path_ignored() {
        let mode = source("[SetDCMTags]\n(zzzz,0010)=x\n");
        let mut mapping = TagMapping::with_sources(Some(mode), None);
        mapping.setup_global_configuration();
        assert_eq!(
            mapping.global().tags.len(),
            defaults::default_mapping().len()
        );
        assert!(mapping.global().options.is_empty());
    }
}
