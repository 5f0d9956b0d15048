//! Built-in mapping tables

use super::tags::*;
use dicom_core::Tag;

/// Default tag assignments applied to every series
pub fn default_mapping() -> Vec<(Tag, &'static str)> {
    vec![
        // Identity
        (PATIENT_NAME, "@PatientName"),
        (PATIENT_ID, "@PatientID"),
        (PATIENT_BIRTH_DATE, "@PatientBirthDay"),
        (PATIENT_SEX, "@PatientSex_DCM"),
        (PATIENT_AGE, "@PatientAge_DCM"),
        (PATIENT_SIZE, "%DIV(@PatientHeight,1000,2)"),
        (PATIENT_WEIGHT, "@PatientWeight"),
        (ACCESSION_NUMBER, "#acc"),
        (STUDY_INSTANCE_UID, "#uid_study"),
        (SERIES_INSTANCE_UID, "#uid_series"),
        (SERIES_NUMBER, "#series"),
        (INSTANCE_NUMBER, "#slice"),
        (MODALITY, "MR"),
        // Institution and device
        (MANUFACTURER, "@Manufacturer"),
        (MANUFACTURER_MODEL_NAME, "@ManufacturersModelName"),
        (INSTITUTION_NAME, "@InstitutionName"),
        (INSTITUTION_ADDRESS, "@InstitutionAddress"),
        (STATION_NAME, "@StationName"),
        (DEVICE_SERIAL_NUMBER, "@DeviceSerialNumber"),
        (SOFTWARE_VERSIONS, "@SoftwareVersions"),
        // Acquisition
        (SERIES_DESCRIPTION, "@ProtocolName"),
        (PROTOCOL_NAME, "@ProtocolName"),
        (SCANNING_SEQUENCE, "@ScanningSequence"),
        (SEQUENCE_VARIANT, "@SequenceVariant"),
        (SCAN_OPTIONS, "@ScanOptions"),
        (MR_ACQUISITION_TYPE, "@MRAcquisitionType"),
        (SEQUENCE_NAME, "@SequenceString"),
        (MAGNETIC_FIELD_STRENGTH, "@MagneticFieldStrength"),
        (TRANSMIT_COIL_NAME, "@TransmittingCoil"),
        (REPETITION_TIME, "%DIV(@mrprot.alTR[0],1000,2)"),
        (ECHO_TIME, "%DIV(@mrprot.alTE[0],1000,2)"),
        (FLIP_ANGLE, "@mrprot.adFlipAngleDegree[0]"),
        // Geometry
        (IMAGE_POSITION_PATIENT, "#image_position"),
        (IMAGE_ORIENTATION_PATIENT, "#image_orientation"),
        (SLICE_LOCATION, "#slice_location"),
        (SLICE_THICKNESS, "#slice_thickness"),
        (SPACING_BETWEEN_SLICES, "#slice_spacing"),
        // Private vendor tags
        (VENDOR_PRIVATE_CREATOR, "SIEMENS MR HEADER"),
        (VENDOR_SLICE_ARRAY_SIZE, "@mrprot.sSliceArray.lSize"),
        (VENDOR_BASE_RESOLUTION, "@mrprot.sKSpace.lBaseResolution"),
        // Timestamps
        (STUDY_DATE, "#acquisition_date"),
        (STUDY_TIME, "#acquisition_time"),
        (SERIES_DATE, "#acquisition_date"),
        (SERIES_TIME, "#acquisition_time"),
        (ACQUISITION_DATE, "#acquisition_date"),
        (ACQUISITION_TIME, "#acquisition_time"),
        (INSTANCE_CREATION_DATE, "#creation_date"),
        (INSTANCE_CREATION_TIME, "#creation_time"),
        (CONTENT_DATE, "#processing_date"),
        (CONTENT_TIME, "#processing_time"),
    ]
}

/// Overrides injected by `Color=TRUE`: RGB, 8 bit, 3 samples per pixel
pub fn color_mapping() -> Vec<(Tag, &'static str)> {
    vec![
        (IMAGE_TYPE, "DERIVED\\SECONDARY\\OTHER"),
        (SAMPLES_PER_PIXEL, "3"),
        (PHOTOMETRIC_INTERPRETATION, "RGB"),
        (PLANAR_CONFIGURATION, "0"),
        (BITS_ALLOCATED, "8"),
        (BITS_STORED, "8"),
        (HIGH_BIT, "7"),
        (PIXEL_REPRESENTATION, "0"),
        (WINDOW_CENTER, "128"),
        (WINDOW_WIDTH, "256"),
        (SERIES_DESCRIPTION, "%EXT(@ProtocolName,_COLOR)"),
    ]
}

/// Overrides injected by `SeriesMode=TIME`
///
/// Each series becomes one time point of a dynamic series.
pub fn time_series_mapping() -> Vec<(Tag, &'static str)> {
    vec![
        (SERIES_DESCRIPTION, "#protname_time"),
        (TEMPORAL_POSITION_IDENTIFIER, "#series"),
        (NUMBER_OF_TEMPORAL_POSITIONS, "#series_count"),
        (FRAME_ACQUISITION_DURATION, "#frame_duration"),
        (SERIES_NUMBER, "1"),
    ]
}
