//! Raw-data container parsing
//!
//! A parse runs four stages over one file:
//! 1. [`header::locate_header`] finds the active measurement header
//! 2. [`protocol::ProtocolScanner`] captures the typed protocol entries
//! 3. [`ascconv::parse_section`] reads the flat ASCCONV parameters
//! 4. [`derived::derive_values`] composes values from the first two
//!
//! The result is an immutable [`RawValueStore`]. Nothing is returned on failure.

pub mod ascconv;
pub mod derived;
pub mod header;
pub mod protocol;
pub mod search;

pub use header::{ContainerLayout, HeaderLocation, MeasurementEntry};
pub use protocol::{ProtocolScanner, ScanOutcome};
pub use search::{EntryType, SearchEntry, SearchSpec};

use crate::error::Result;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Parsed raw values of one container file
///
/// Keys are flat identifiers (`PatientName`) or `mrprot.`-prefixed ASCCONV
/// paths. All values are stored as text; numeric accessors parse on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize), serde(transparent))]
pub struct RawValueStore {
    values: BTreeMap<String, String>,
}

impl RawValueStore {
    /// Returns the value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Returns the value for `key`, or an empty string if missing
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Parses the value for `key` as a float
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|s| s.trim().parse().ok())
    }

    /// Parses the value for `key` as an integer
    ///
    /// Accepts hexadecimal values with a `0x` prefix as written in ASCCONV.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        let s = self.get(key)?.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => i64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates all entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for RawValueStore {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Reader for raw-data container files
///
/// Each call to [`TwixReader::read_file`] works on its own pending search
/// list, so one reader can parse many files in sequence.
#[derive(Debug, Clone)]
pub struct TwixReader {
    search_spec: SearchSpec,
}

impl Default for TwixReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TwixReader {
    /// Creates a reader with the built-in search catalogue
    pub fn new() -> Self {
        Self::with_search_spec(SearchSpec::standard())
    }

    /// Creates a reader with a custom search catalogue
    pub fn with_search_spec(search_spec: SearchSpec) -> Self {
        Self { search_spec }
    }

    pub fn search_spec(&self) -> &SearchSpec {
        &self.search_spec
    }

    /// Parses a container file
    ///
    /// # Errors
    ///
    /// - `Io` if the file cannot be opened or read
    /// - `Format` if the container layout is invalid
    /// - `MissingMandatoryField` if mandatory protocol entries are absent
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> Result<RawValueStore> {
        let path = path.as_ref();
        info!("Reading raw-data file {}", path.display());
        let file = File::open(path)?;
        self.read(&mut BufReader::new(file))
    }

    /// Parses a container from any seekable reader
    pub fn read<R: Read + Seek>(&self, reader: &mut R) -> Result<RawValueStore> {
        let location = header::locate_header(reader)?;
        info!(
            "Header size is {} ({} container)",
            location.header_length, location.layout
        );

        reader.seek(SeekFrom::Start(location.measurement_start))?;
        let mut header = Vec::with_capacity(location.header_length as usize);
        reader
            .take(u64::from(location.header_length))
            .read_to_end(&mut header)?;

        let mut values = BTreeMap::new();
        let mut lines = header_lines(&header).peekable();

        let mut scanner = ProtocolScanner::new(self.search_spec.clone());
        match scanner.scan(&mut lines, &mut values) {
            ScanOutcome::SectionFound => {
                if !ascconv::parse_section(&mut lines, &mut values) {
                    warn!("ASCCONV section not terminated before header end");
                }
            }
            ScanOutcome::EndOfHeader => {
                warn!("No ASCCONV section found in header");
            }
        }

        for entry in scanner.pending() {
            if !entry.mandatory {
                debug!("Optional entry {} not found", entry.id);
            }
        }
        scanner.finish()?;

        let derived = derived::derive_values(&values);
        values.extend(derived);

        Ok(RawValueStore { values })
    }
}

/// Splits header bytes into newline-delimited text lines
fn header_lines(header: &[u8]) -> impl Iterator<Item = String> + '_ {
    header.split(|&b| b == b'\n').map(|line| {
        String::from_utf8_lossy(line)
            .trim_end_matches('\r')
            .to_string()
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::RawTagsError;
    use std::io::Cursor;

    /// Protocol text with all mandatory entries and a short ASCCONV section
    pub(crate) const SAMPLE_PROTOCOL: &str = r#"<XProtocol>
{
  <ParamString."tPatientName">  { "Doe^John"  }
  <ParamString."PatientID">  { "PID0001"  }
  <ParamLong."PatientSex">  { 2  }
  <ParamDouble."flPatientAge">  { <Precision> 6  45.000000  }
  <ParamString."tProtocolName">  { "t1_se_tra"  }
  <ParamString."MRAcquisitionType">  { "2D"  }
  <ParamString."DeviceSerialNumber">  { "45074"  }
  <ParamDouble."flMagneticFieldStrength">  { <Precision> 6  1.494000  }
  <ParamString."FrameOfReference">  { "1.3.12.2.1107.5.2.19.45074.1.20160503114720123.0.0.0"  }
  <ParamLong."TotalScanTimeSec">  { 120  }
}
### ASCCONV BEGIN ###
sWiPMemBlock.alFree[0]	 = 5
alTR[0]                                  = 2500000
alTE[0]                                  = 15000
sSliceArray.lSize                        = 2
sSliceArray.asSlice[0].dThickness        = 5
sSliceArray.asSlice[0].dPhaseFOV         = 200
sSliceArray.asSlice[0].dReadoutFOV       = 200
sSliceArray.asSlice[0].sNormal.dTra      = 1
sSliceArray.asSlice[0].sPosition.dTra    = -10
sSliceArray.asSlice[1].dThickness        = 5
sSliceArray.asSlice[1].dPhaseFOV         = 200
sSliceArray.asSlice[1].dReadoutFOV       = 200
sSliceArray.asSlice[1].sNormal.dTra      = 1
sSliceArray.asSlice[1].sPosition.dTra    = 10
sKSpace.lBaseResolution                  = 256
tProtocolName                            = "t1_se_tra"
### ASCCONV END ###
"#;

    /// Builds a legacy-generation container around `protocol`
    pub(crate) fn legacy_container(protocol: &str) -> Vec<u8> {
        let header_length = (4 + protocol.len()) as u32;
        let mut data = header_length.to_le_bytes().to_vec();
        data.extend_from_slice(protocol.as_bytes());
        data.extend_from_slice(&[0u8; 64]);
        data
    }

    /// Builds a multi-measurement container whose last measurement holds `protocol`
    pub(crate) fn multi_measurement_container(protocol: &str) -> Vec<u8> {
        let offsets = [1024u64, 2048u64];
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&(offsets.len() as u32).to_le_bytes());
        for (i, offset) in offsets.iter().enumerate() {
            data.extend_from_slice(&(i as u32).to_le_bytes());
            data.extend_from_slice(&0u32.to_le_bytes());
            data.extend_from_slice(&offset.to_le_bytes());
            data.extend_from_slice(&0u64.to_le_bytes());
            data.extend_from_slice(&[0u8; 2 * header::ENTRY_NAME_LEN]);
        }
        data.resize(offsets[0] as usize, 0);
        data.extend_from_slice(&legacy_container("<XProtocol> { stale }\n"));
        data.resize(offsets[1] as usize, 0);
        data.extend_from_slice(&legacy_container(protocol));
        data
    }

    #[test]
    fn test_read_legacy_container() {
        let store = TwixReader::new()
            .read(&mut Cursor::new(legacy_container(SAMPLE_PROTOCOL)))
            .unwrap();

        assert_eq!(store.value("PatientName"), "Doe^John");
        assert_eq!(store.value("MagneticFieldStrength"), "1.494000");
        assert_eq!(store.value("mrprot.sWipMemBlock.alFree[0]"), "5");
        assert_eq!(store.value("mrprot.tProtocolName"), "t1_se_tra");
        assert_eq!(store.get_i64("mrprot.alTR[0]"), Some(2_500_000));
        assert_eq!(store.value("StationName"), "MRC45074");
        assert_eq!(store.value("PatientSex_DCM"), "M");
        assert_eq!(store.value("PatientAge_DCM"), "45Y");
        assert_eq!(store.value("FrameOfReference_Date"), "2016-05-03");
        assert_eq!(store.value("FrameOfReference_Time"), "11:47:20");
    }

    #[test]
    fn test_read_multi_measurement_container_uses_last() {
        let store = TwixReader::new()
            .read(&mut Cursor::new(multi_measurement_container(SAMPLE_PROTOCOL)))
            .unwrap();
        assert_eq!(store.value("PatientID"), "PID0001");
        assert_eq!(store.value("mrprot.sKSpace.lBaseResolution"), "256");
    }

    #[test]
    fn test_missing_mandatory_entry_fails() {
        let protocol = SAMPLE_PROTOCOL.replace("tPatientName", "tSomethingElse");
        let result = TwixReader::new().read(&mut Cursor::new(legacy_container(&protocol)));
        match result {
            Err(RawTagsError::MissingMandatoryField(ids)) => {
                assert_eq!(ids, vec!["PatientName".to_string()])
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_scanning_bounded_by_header_end() {
        let protocol = "<ParamString.\"tPatientName\"> { \"A\" }\n";
        let mut data = legacy_container(protocol);
        data.extend_from_slice(b"<ParamString.\"PatientID\"> { \"B\" }\n");
        let spec = SearchSpec::new()
            .with_entry(SearchEntry::new(
                "PatientName",
                "<ParamString.\"tPatientName\">",
                EntryType::String,
                true,
            ))
            .with_entry(SearchEntry::new(
                "PatientID",
                "<ParamString.\"PatientID\">",
                EntryType::String,
                false,
            ));
        let store = TwixReader::with_search_spec(spec)
            .read(&mut Cursor::new(data))
            .unwrap();
        assert_eq!(store.value("PatientName"), "A");
        assert!(!store.contains("PatientID"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = TwixReader::new().read_file("/nonexistent/meas.dat");
        assert!(matches!(result, Err(RawTagsError::Io(_))));
    }

    #[test]
    fn test_store_accessors() {
        let store: RawValueStore = vec![
            ("a".to_string(), " 1.5 ".to_string()),
            ("b".to_string(), "0x10".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(store.get_f64("a"), Some(1.5));
        assert_eq!(store.get_i64("b"), Some(16));
        assert_eq!(store.value("missing"), "");
        assert_eq!(store.len(), 2);
    }
}
