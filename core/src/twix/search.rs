//! Catalogue of typed protocol entries searched in the embedded text protocol

use std::fmt;

/// Declared type of a protocol entry, controls value conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    String,
    Bool,
    Long,
    Double,
    /// Left undecoded, stored as empty string
    Array,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryType::String => "STRING",
            EntryType::Bool => "BOOL",
            EntryType::Long => "LONG",
            EntryType::Double => "DOUBLE",
            EntryType::Array => "ARRAY",
        };
        write!(f, "{}", name)
    }
}

/// One entry of the search list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    /// Key under which the value is stored
    pub id: String,
    /// Substring identifying the entry's line
    pub marker: String,
    pub entry_type: EntryType,
    /// Parse fails if this entry is still pending after the scan
    pub mandatory: bool,
}

impl SearchEntry {
    pub fn new(id: &str, marker: &str, entry_type: EntryType, mandatory: bool) -> Self {
        Self {
            id: id.to_string(),
            marker: marker.to_string(),
            entry_type,
            mandatory,
        }
    }
}

/// Ordered list of protocol entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSpec {
    entries: Vec<SearchEntry>,
}

impl SearchSpec {
    /// Creates an empty search list
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: appends an entry
    pub fn with_entry(mut self, entry: SearchEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Appends an entry
    pub fn add(&mut self, id: &str, marker: &str, entry_type: EntryType, mandatory: bool) {
        self.entries
            .push(SearchEntry::new(id, marker, entry_type, mandatory));
    }

    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<SearchEntry> {
        self.entries
    }

    /// Built-in catalogue of scanner acquisition parameters
    pub fn standard() -> Self {
        let mut spec = Self::new();
        spec.add(
            "PatientName",
            r#"<ParamString."tPatientName">"#,
            EntryType::String,
            true,
        );
        spec.add(
            "PatientID",
            r#"<ParamString."PatientID">"#,
            EntryType::String,
            true,
        );
        spec.add(
            "PatientBirthDay",
            r#"<ParamString."PatientBirthDay">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "PatientSex",
            r#"<ParamLong."PatientSex">"#,
            EntryType::Long,
            false,
        );
        spec.add(
            "PatientAge",
            r#"<ParamDouble."flPatientAge">"#,
            EntryType::Double,
            false,
        );
        spec.add(
            "PatientHeight",
            r#"<ParamDouble."flPatientHeight">"#,
            EntryType::Double,
            false,
        );
        spec.add(
            "PatientWeight",
            r#"<ParamDouble."flUsedPatientWeight">"#,
            EntryType::Double,
            false,
        );
        spec.add(
            "ProtocolName",
            r#"<ParamString."tProtocolName">"#,
            EntryType::String,
            true,
        );
        spec.add(
            "SequenceString",
            r#"<ParamString."SequenceString">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "ScanningSequence",
            r#"<ParamString."ScanningSequence">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "SequenceVariant",
            r#"<ParamString."SequenceVariant">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "ScanOptions",
            r#"<ParamString."ScanOptions">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "MRAcquisitionType",
            r#"<ParamString."MRAcquisitionType">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "Manufacturer",
            r#"<ParamString."Manufacturer">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "ManufacturersModelName",
            r#"<ParamString."ManufacturersModelName">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "InstitutionName",
            r#"<ParamString."InstitutionName">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "InstitutionAddress",
            r#"<ParamString."InstitutionAddress">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "DeviceSerialNumber",
            r#"<ParamString."DeviceSerialNumber">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "SoftwareVersions",
            r#"<ParamString."SoftwareVersions">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "MagneticFieldStrength",
            r#"<ParamDouble."flMagneticFieldStrength">"#,
            EntryType::Double,
            false,
        );
        spec.add(
            "FrameOfReference",
            r#"<ParamString."FrameOfReference">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "TransmittingCoil",
            r#"<ParamString."TransmittingCoil">"#,
            EntryType::String,
            false,
        );
        spec.add(
            "TotalScanTimeSec",
            r#"<ParamLong."TotalScanTimeSec">"#,
            EntryType::Long,
            false,
        );
        spec.add(
            "IsInlineComposed",
            r#"<ParamBool."IsInlineComposed">"#,
            EntryType::Bool,
            false,
        );
        spec.add(
            "CoilElementID",
            r#"<ParamArray."CoilElementID">"#,
            EntryType::Array,
            false,
        );
        spec
    }
}
