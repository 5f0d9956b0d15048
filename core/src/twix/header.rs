//! Container generation detection and measurement header location
//!
//! Two layouts exist. The legacy generation holds a single measurement whose
//! header starts at byte 0. The newer generation starts with a measurement
//! directory (id, count, fixed-size entries); the last entry is the most
//! recent scan and the only one parsed.

use crate::error::{RawTagsError, Result};
use log::{debug, warn};
use std::fmt;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Highest plausible number of measurements in a multi-measurement file
pub const MAX_MEASUREMENTS: u32 = 30;

/// Largest accepted header length in bytes (inclusive)
pub const MAX_HEADER_LENGTH: u32 = 5_000_000;

/// Fixed width of the name fields in a directory entry
pub const ENTRY_NAME_LEN: usize = 64;

/// Size of one directory entry: ids, offset/length pair and two name fields
pub const ENTRY_LEN: usize = 4 + 4 + 8 + 8 + 2 * ENTRY_NAME_LEN;

/// Largest first-word-zero second word still classified as multi-measurement
const MULTI_MEAS_SIGNATURE_LIMIT: u32 = 64;

/// One record of the multi-measurement directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementEntry {
    pub meas_id: u32,
    pub field_id: u32,
    pub offset: u64,
    pub length: u64,
    pub patient_name: String,
    pub protocol_name: String,
}

impl MeasurementEntry {
    /// Decodes a little-endian directory record
    pub fn from_bytes(buf: &[u8; ENTRY_LEN]) -> Self {
        let u32_at =
            |pos: usize| u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]);
        let u64_at = |pos: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[pos..pos + 8]);
            u64::from_le_bytes(bytes)
        };

        Self {
            meas_id: u32_at(0),
            field_id: u32_at(4),
            offset: u64_at(8),
            length: u64_at(16),
            patient_name: fixed_width_text(&buf[24..24 + ENTRY_NAME_LEN]),
            protocol_name: fixed_width_text(&buf[24 + ENTRY_NAME_LEN..ENTRY_LEN]),
        }
    }
}

/// Container layout, selected once from the leading signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerLayout {
    /// Single measurement, header at byte 0
    Legacy,
    /// Directory of measurements, the last one is active
    MultiMeasurement {
        id: u32,
        entries: Vec<MeasurementEntry>,
    },
}

impl ContainerLayout {
    /// Returns true when the first two words carry the multi-measurement signature
    pub fn is_multi_measurement_signature(word0: u32, word1: u32) -> bool {
        word0 == 0 && word1 <= MULTI_MEAS_SIGNATURE_LIMIT
    }

    /// Byte offset of the active measurement
    pub fn measurement_start(&self) -> u64 {
        match self {
            ContainerLayout::Legacy => 0,
            ContainerLayout::MultiMeasurement { entries, .. } => {
                entries.last().map(|entry| entry.offset).unwrap_or(0)
            }
        }
    }

    /// Short generation name for log output
    pub fn simple_name(&self) -> &'static str {
        match self {
            ContainerLayout::Legacy => "legacy",
            ContainerLayout::MultiMeasurement { .. } => "multi-measurement",
        }
    }
}

impl fmt::Display for ContainerLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Located header of the active measurement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLocation {
    pub layout: ContainerLayout,
    pub measurement_start: u64,
    pub header_length: u32,
}

impl HeaderLocation {
    /// Hard upper bound for all text scanning
    pub fn header_end(&self) -> u64 {
        self.measurement_start + u64::from(self.header_length)
    }
}

/// Detects the container generation and locates the active measurement header
///
/// # Errors
///
/// - `Format` if the measurement count is outside `[1, 30]`, the directory
///   cannot be read, or the header length is outside `(0, 5_000_000]`
/// - `Io` for any other read failure
pub fn locate_header<R: Read + Seek>(reader: &mut R) -> Result<HeaderLocation> {
    reader.seek(SeekFrom::Start(0))?;
    let word0 = read_u32(reader, "file signature")?;
    let word1 = read_u32(reader, "file signature")?;

    let layout = if ContainerLayout::is_multi_measurement_signature(word0, word1) {
        reader.seek(SeekFrom::Start(0))?;
        read_directory(reader)?
    } else {
        ContainerLayout::Legacy
    };

    let measurement_start = layout.measurement_start();
    reader.seek(SeekFrom::Start(measurement_start))?;
    let header_length = read_u32(reader, "header length")?;

    if header_length == 0 || header_length > MAX_HEADER_LENGTH {
        warn!("Unusual header size {} (file type {})", header_length, layout);
        return Err(RawTagsError::Format(format!(
            "unusual header size {}",
            header_length
        )));
    }

    debug!(
        "Detected {} container, measurement at {}, header size {}",
        layout, measurement_start, header_length
    );

    Ok(HeaderLocation {
        layout,
        measurement_start,
        header_length,
    })
}

/// Reads the measurement directory of a multi-measurement file
fn read_directory<R: Read>(reader: &mut R) -> Result<ContainerLayout> {
    let id = read_u32(reader, "file id")?;
    let count = read_u32(reader, "measurement count")?;

    if count == 0 || count > MAX_MEASUREMENTS {
        warn!("Number of measurements in file {}", count);
        return Err(RawTagsError::Format(format!(
            "invalid number of measurements ({})",
            count
        )));
    }

    let mut entries = Vec::with_capacity(count as usize);
    for index in 0..count {
        let mut buf = [0u8; ENTRY_LEN];
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => RawTagsError::Format(format!(
                "truncated measurement directory entry {}",
                index
            )),
            _ => RawTagsError::Io(e),
        })?;
        entries.push(MeasurementEntry::from_bytes(&buf));
    }

    Ok(ContainerLayout::MultiMeasurement { id, entries })
}

fn read_u32<R: Read>(reader: &mut R, what: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => RawTagsError::Format(format!("unable to read {}", what)),
        _ => RawTagsError::Io(e),
    })?;
    Ok(u32::from_le_bytes(buf))
}

/// Decodes a NUL-padded fixed-width text field
fn fixed_width_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}
