use crate::processor::ProcessingReport;
use std::fmt;

/// Text report of a processing run
pub struct TextReport<'a> {
    report: &'a ProcessingReport,
}

impl<'a> TextReport<'a> {
    pub fn new(report: &'a ProcessingReport) -> Self {
        Self { report }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tag Transfer")?;
        writeln!(f, "============")?;
        writeln!(f)?;
        writeln!(f, "Raw-data file:  {}", self.report.raw_file.display())?;
        writeln!(f, "Output folder:  {}", self.report.output_dir.display())?;
        writeln!(f, "Study UID:      {}", self.report.study_uid)?;
        writeln!(f, "Files written:  {}", self.report.files_written())?;
        writeln!(f)?;

        for series in &self.report.series {
            write!(
                f,
                "Series {}: {}/{} slices",
                series.series, series.slices_written, series.slice_count
            )?;
            match &series.error {
                Some(error) => writeln!(f, " -- FAILED: {}", error)?,
                None => writeln!(f)?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::SeriesReport;
    use std::path::PathBuf;

    fn report() -> ProcessingReport {
        ProcessingReport {
            raw_file: PathBuf::from("meas.dat"),
            output_dir: PathBuf::from("out"),
            study_uid: "2.25.1".to_string(),
            series: vec![
                SeriesReport {
                    series: 1,
                    slice_count: 2,
                    slices_written: 2,
                    series_uid: "2.25.2".to_string(),
                    error: None,
                },
                SeriesReport {
                    series: 2,
                    slice_count: 3,
                    slices_written: 1,
                    series_uid: "2.25.3".to_string(),
                    error: Some("Write error: disk full".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_text_report() {
        let report = report();
        let text = TextReport::new(&report).to_string();
        assert!(text.contains("Files written:  3"));
        assert!(text.contains("Series 1: 2/2 slices\n"));
        assert!(text.contains("Series 2: 1/3 slices -- FAILED: Write error: disk full"));
    }
}
