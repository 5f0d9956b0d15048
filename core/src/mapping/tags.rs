use dicom_core::Tag;

// Patient Tags
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010, 0x0030);
pub const PATIENT_SEX: Tag = Tag(0x0010, 0x0040);
pub const PATIENT_AGE: Tag = Tag(0x0010, 0x1010);
pub const PATIENT_SIZE: Tag = Tag(0x0010, 0x1020);
pub const PATIENT_WEIGHT: Tag = Tag(0x0010, 0x1030);

// Study/Series Identification Tags
pub const ACCESSION_NUMBER: Tag = Tag(0x0008, 0x0050);
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
pub const SERIES_NUMBER: Tag = Tag(0x0020, 0x0011);
pub const INSTANCE_NUMBER: Tag = Tag(0x0020, 0x0013);
pub const MODALITY: Tag = Tag(0x0008, 0x0060);

// Date/Time Tags
pub const INSTANCE_CREATION_DATE: Tag = Tag(0x0008, 0x0012);
pub const INSTANCE_CREATION_TIME: Tag = Tag(0x0008, 0x0013);
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
pub const SERIES_DATE: Tag = Tag(0x0008, 0x0021);
pub const ACQUISITION_DATE: Tag = Tag(0x0008, 0x0022);
pub const CONTENT_DATE: Tag = Tag(0x0008, 0x0023);
pub const STUDY_TIME: Tag = Tag(0x0008, 0x0030);
pub const SERIES_TIME: Tag = Tag(0x0008, 0x0031);
pub const ACQUISITION_TIME: Tag = Tag(0x0008, 0x0032);
pub const CONTENT_TIME: Tag = Tag(0x0008, 0x0033);

// Device/Institution Tags
pub const MANUFACTURER: Tag = Tag(0x0008, 0x0070);
pub const INSTITUTION_NAME: Tag = Tag(0x0008, 0x0080);
pub const INSTITUTION_ADDRESS: Tag = Tag(0x0008, 0x0081);
pub const STATION_NAME: Tag = Tag(0x0008, 0x1010);
pub const MANUFACTURER_MODEL_NAME: Tag = Tag(0x0008, 0x1090);
pub const DEVICE_SERIAL_NUMBER: Tag = Tag(0x0018, 0x1000);
pub const SOFTWARE_VERSIONS: Tag = Tag(0x0018, 0x1020);

// Acquisition Tags
pub const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);
pub const PROTOCOL_NAME: Tag = Tag(0x0018, 0x1030);
pub const SCANNING_SEQUENCE: Tag = Tag(0x0018, 0x0020);
pub const SEQUENCE_VARIANT: Tag = Tag(0x0018, 0x0021);
pub const SCAN_OPTIONS: Tag = Tag(0x0018, 0x0022);
pub const MR_ACQUISITION_TYPE: Tag = Tag(0x0018, 0x0023);
pub const SEQUENCE_NAME: Tag = Tag(0x0018, 0x0024);
pub const SLICE_THICKNESS: Tag = Tag(0x0018, 0x0050);
pub const REPETITION_TIME: Tag = Tag(0x0018, 0x0080);
pub const ECHO_TIME: Tag = Tag(0x0018, 0x0081);
pub const MAGNETIC_FIELD_STRENGTH: Tag = Tag(0x0018, 0x0087);
pub const SPACING_BETWEEN_SLICES: Tag = Tag(0x0018, 0x0088);
pub const TRANSMIT_COIL_NAME: Tag = Tag(0x0018, 0x1251);
pub const FLIP_ANGLE: Tag = Tag(0x0018, 0x1314);
pub const FRAME_ACQUISITION_DURATION: Tag = Tag(0x0018, 0x9220);

// Geometry Tags
pub const IMAGE_POSITION_PATIENT: Tag = Tag(0x0020, 0x0032);
pub const IMAGE_ORIENTATION_PATIENT: Tag = Tag(0x0020, 0x0037);
pub const SLICE_LOCATION: Tag = Tag(0x0020, 0x1041);

// Temporal Tags
pub const TEMPORAL_POSITION_IDENTIFIER: Tag = Tag(0x0020, 0x0100);
pub const NUMBER_OF_TEMPORAL_POSITIONS: Tag = Tag(0x0020, 0x0105);

// Image Pixel Tags
pub const IMAGE_TYPE: Tag = Tag(0x0008, 0x0008);
pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
pub const PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
pub const BITS_STORED: Tag = Tag(0x0028, 0x0101);
pub const HIGH_BIT: Tag = Tag(0x0028, 0x0102);
pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
pub const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
pub const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);

// Private Vendor Tags
pub const VENDOR_PRIVATE_CREATOR: Tag = Tag(0x0019, 0x0010);
pub const VENDOR_SLICE_ARRAY_SIZE: Tag = Tag(0x0019, 0x1010);
pub const VENDOR_BASE_RESOLUTION: Tag = Tag(0x0019, 0x1011);

/// Parses a tag path of the form `(gggg,eeee)`
///
/// Whitespace around the numbers is ignored and hex digits may be upper or
/// lower case. Returns `None` if the text is not a tag path.
pub fn parse_tag_path(text: &str) -> Option<Tag> {
    let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (group, element) = inner.split_once(',')?;
    let group = u16::from_str_radix(group.trim(), 16).ok()?;
    let element = u16::from_str_radix(element.trim(), 16).ok()?;
    Some(Tag(group, element))
}

/// Formats a tag as `(gggg,eeee)` with upper-case hex digits
pub fn format_tag_path(tag: Tag) -> String {
    format!("({:04X},{:04X})", tag.group(), tag.element())
}
