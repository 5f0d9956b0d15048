//! Values composed from protocol and ASCCONV entries

use std::collections::BTreeMap;

/// Prefix of the station name built from the device serial number
const STATION_PREFIX: &str = "MRC";

/// Dot-separated segments of the frame-of-reference UID preceding its timestamp
const FRAME_OF_REFERENCE_PREFIX_SEGMENTS: usize = 10;

/// Length of the `YYYYMMDDHHMMSS` timestamp
const TIMESTAMP_LEN: usize = 14;

/// Computes derived values from the captured raw values
///
/// Returned pairs are meant to be merged into the value store.
pub fn derive_values(values: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut derived = Vec::new();

    if let Some(serial) = values.get("DeviceSerialNumber") {
        derived.push((
            "StationName".to_string(),
            format!("{}{}", STATION_PREFIX, serial),
        ));
    }

    if let Some(age) = values.get("PatientAge").and_then(|s| s.trim().parse::<f64>().ok()) {
        derived.push(("PatientAge_DCM".to_string(), format!("{}Y", age.trunc() as i64)));
    }

    let sex = values.get("PatientSex").map(|s| s.trim()).unwrap_or("");
    derived.push(("PatientSex_DCM".to_string(), dicom_sex(sex).to_string()));

    if let Some(frame_of_reference) = values.get("FrameOfReference") {
        if let Some((date, time)) = frame_of_reference_timestamp(frame_of_reference) {
            derived.push(("FrameOfReference_Date".to_string(), date));
            derived.push(("FrameOfReference_Time".to_string(), time));
        }
    }

    derived
}

/// Maps the protocol's numeric sex code onto the DICOM code string
pub fn dicom_sex(code: &str) -> &'static str {
    match code {
        "1" => "F",
        "2" => "M",
        _ => "O",
    }
}

/// Extracts `(YYYY-MM-DD, HH:MM:SS)` from a frame-of-reference UID
///
/// The timestamp follows the first ten dot-separated segments. Returns `None`
/// for shorter identifiers.
pub fn frame_of_reference_timestamp(uid: &str) -> Option<(String, String)> {
    let mut segments = uid.splitn(FRAME_OF_REFERENCE_PREFIX_SEGMENTS + 1, '.');
    for _ in 0..FRAME_OF_REFERENCE_PREFIX_SEGMENTS {
        segments.next()?;
    }
    let remainder = segments.next()?;

    let stamp = remainder.get(..TIMESTAMP_LEN)?;
    if !stamp.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let date = format!("{}-{}-{}", &stamp[0..4], &stamp[4..6], &stamp[6..8]);
    let time = format!("{}:{}:{}", &stamp[8..10], &stamp[10..12], &stamp[12..14]);
    Some((date, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn lookup<'a>(derived: &'a [(String, String)], key: &str) -> Option<&'a str> {
        derived
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_station_name_requires_serial() {
        let derived = derive_values(&values(&[("DeviceSerialNumber", "45074")]));
        assert_eq!(lookup(&derived, "StationName"), Some("MRC45074"));

        let derived = derive_values(&values(&[]));
        assert_eq!(lookup(&derived, "StationName"), None);
    }

    #[test]
    fn test_age_truncated() {
        let derived = derive_values(&values(&[("PatientAge", "45.900000")]));
        assert_eq!(lookup(&derived, "PatientAge_DCM"), Some("45Y"));
    }

    #[test]
    fn test_sex_codes() {
        assert_eq!(dicom_sex("1"), "F");
        assert_eq!(dicom_sex("2"), "M");
        assert_eq!(dicom_sex("3"), "O");
        assert_eq!(dicom_sex(""), "O");
        let derived = derive_values(&values(&[]));
        assert_eq!(lookup(&derived, "PatientSex_DCM"), Some("O"));
    }

    #[test]
    fn test_frame_of_reference_timestamp() {
        let uid = "1.3.12.2.1107.5.2.19.45074.1.20160503114720123.0.0.0";
        let (date, time) = frame_of_reference_timestamp(uid).unwrap();
        assert_eq!(date, "2016-05-03");
        assert_eq!(time, "11:47:20");
    }

    #[test]
    fn test_short_frame_of_reference_ignored() {
        assert!(frame_of_reference_timestamp("1.3.12.2.1107").is_none());
        let derived = derive_values(&values(&[("FrameOfReference", "1.3.12")]));
        assert_eq!(lookup(&derived, "FrameOfReference_Date"), None);
        assert_eq!(lookup(&derived, "FrameOfReference_Time"), None);
    }
}
