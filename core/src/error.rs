use thiserror::Error;

/// Result type for raw-data tag operations
pub type Result<T> = std::result::Result<T, RawTagsError>;

/// Error types for raw-data parsing, mapping and tag writing
#[derive(Error, Debug)]
pub enum RawTagsError {
    /// I/O error (file unreadable or unopenable)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Container layout violates the expected bounds
    #[error("File is invalid: {0}")]
    Format(String),

    /// Mandatory protocol entries were not found before the header ended
    #[error("Not all raw-data entries found: {}", .0.join(", "))]
    MissingMandatoryField(Vec<String>),

    /// Mapping configuration could not be read
    #[error("Configuration error: {0}")]
    Config(String),

    /// Target file could not be loaded, modified or saved
    #[error("Write error: {0}")]
    Write(String),

    /// DICOM reading error
    #[error("DICOM error: {0}")]
    Dicom(String),
}

// Convert dicom-object errors
impl From<dicom_object::ReadError> for RawTagsError {
    fn from(e: dicom_object::ReadError) -> Self {
        RawTagsError::Dicom(format!("{}", e))
    }
}

impl From<dicom_object::WriteError> for RawTagsError {
    fn from(e: dicom_object::WriteError) -> Self {
        RawTagsError::Write(format!("{}", e))
    }
}
