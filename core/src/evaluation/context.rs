//! Per-slice evaluation context

use super::geometry::SliceGeometry;
use chrono::{Duration, Local, NaiveDateTime};

/// DICOM DA rendering
pub const DATE_FORMAT: &str = "%Y%m%d";
/// DICOM TM rendering
pub const TIME_FORMAT: &str = "%H%M%S";

/// State of one output slice
///
/// Counters are 1-based. Built per slice and dropped once its tag set is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceContext {
    pub slice: usize,
    pub slice_count: usize,
    pub series: usize,
    pub series_count: usize,
    /// Added to `series` when rendered
    pub series_offset: i64,
    pub series_uid: String,
    pub study_uid: String,
    pub accession_number: String,
    pub processing_time: NaiveDateTime,
    pub creation_time: NaiveDateTime,
    pub acquisition_time: NaiveDateTime,
    /// Seconds per time point, only set for time series
    pub frame_duration: Option<f64>,
    pub geometry: SliceGeometry,
}

impl SliceContext {
    /// Creates a context for slice 1 of series 1, timestamped now
    pub fn new(study_uid: &str, series_uid: &str) -> Self {
        let now = Local::now().naive_local();
        Self {
            slice: 1,
            slice_count: 1,
            series: 1,
            series_count: 1,
            series_offset: 0,
            series_uid: series_uid.to_string(),
            study_uid: study_uid.to_string(),
            accession_number: String::new(),
            processing_time: now,
            creation_time: now,
            acquisition_time: now,
            frame_duration: None,
            geometry: SliceGeometry::default(),
        }
    }

    /// Series number as written to the output
    pub fn series_number(&self) -> i64 {
        self.series as i64 + self.series_offset
    }

    /// Seconds between the first time point and this series
    pub fn time_offset(&self) -> f64 {
        self.frame_duration
            .map(|duration| duration * (self.series.saturating_sub(1)) as f64)
            .unwrap_or(0.0)
    }

    /// Acquisition time shifted by the time point of this series
    pub fn shifted_acquisition_time(&self) -> NaiveDateTime {
        let millis = (self.time_offset() * 1000.0).round() as i64;
        self.acquisition_time + Duration::milliseconds(millis)
    }
}

pub fn format_date(timestamp: &NaiveDateTime) -> String {
    timestamp.format(DATE_FORMAT).to_string()
}

pub fn format_time(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIME_FORMAT).to_string()
}
