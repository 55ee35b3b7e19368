//! Output formats for the report document.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{ReportError, ReportResult};
use crate::report::model::Workbook;
use crate::report::xlsx;

/// Trait for report serializers
///
/// Implementations write a finished [`Workbook`] into an already-open file:
/// - `XlsxFormat` for the spreadsheet artifact
/// - `JsonFormat` for a machine-readable dump of the same document
pub trait ReportFormat: std::fmt::Debug + Send + Sync {
    /// File extension without the dot
    fn extension(&self) -> &'static str;

    /// Serialize `workbook` into `out`
    fn write(&self, workbook: &Workbook, out: &mut File) -> ReportResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxFormat;

impl ReportFormat for XlsxFormat {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn write(&self, workbook: &Workbook, out: &mut File) -> ReportResult<()> {
        xlsx::write_xlsx(workbook, &mut *out)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl ReportFormat for JsonFormat {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, workbook: &Workbook, out: &mut File) -> ReportResult<()> {
        let mut writer = BufWriter::new(&mut *out);
        serde_json::to_writer_pretty(&mut writer, workbook)?;
        writer.flush()?;
        Ok(())
    }
}

/// Open a report written in any supported format, chosen by extension
pub fn read_report(path: &Path) -> ReportResult<Workbook> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xlsx") => xlsx::read_workbook(path),
        Some("json") => {
            let file = File::open(path)?;
            Ok(serde_json::from_reader(BufReader::new(file))?)
        }
        other => Err(ReportError::InvalidReport(format!(
            "unsupported report extension: {}",
            other.unwrap_or("<none>")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::model::{Row, RowStyle, Sheet};

    fn workbook() -> Workbook {
        let mut sheet = Sheet::new("Results");
        sheet.push(Row::new(["Scenario"]).styled(RowStyle::Header));
        sheet.push(Row::new(["Home"]));
        Workbook { sheets: vec![sheet] }
    }

    #[test]
    fn test_each_format_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let formats: [&dyn ReportFormat; 2] = [&XlsxFormat, &JsonFormat];
        for format in formats {
            let path = dir.path().join(format!("report.{}", format.extension()));
            let mut file = File::create(&path).unwrap();
            format.write(&workbook(), &mut file).unwrap();
            drop(file);
            let read = read_report(&path).unwrap();
            assert_eq!(read.sheets[0].rows, workbook().sheets[0].rows);
        }
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = read_report(Path::new("report.csv")).unwrap_err();
        assert!(matches!(err, ReportError::InvalidReport(_)));
    }
}
