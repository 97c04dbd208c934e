//! CSV export of the converted table.
//!
//! The download artifact is UTF-8 comma-separated text with a header row,
//! minimal quoting and no index column.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::ExportResult;
use crate::models::{OutputRecord, OUTPUT_HEADERS};

/// File name offered for download.
pub const DOWNLOAD_FILE_NAME: &str = "tynic_upload.csv";

/// MIME type of the download.
pub const DOWNLOAD_MIME: &str = "text/csv";

/// A ready-to-send CSV artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Download {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub content: String,
}

/// Write the header row and one line per record.
pub fn write_csv<W: Write>(writer: W, records: &[OutputRecord]) -> ExportResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(OUTPUT_HEADERS)?;
    for record in records {
        wtr.write_record(record.values())?;
    }
    wtr.flush()?;

    Ok(())
}

/// Serialize records to CSV text.
pub fn serialize(records: &[OutputRecord]) -> ExportResult<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, records)?;
    Ok(String::from_utf8(buf)?)
}

/// Build the download artifact for a set of records.
pub fn download(records: &[OutputRecord]) -> ExportResult<Download> {
    Ok(Download {
        file_name: DOWNLOAD_FILE_NAME,
        mime_type: DOWNLOAD_MIME,
        content: serialize(records)?,
    })
}

/// Write the CSV artifact to a file.
pub fn write_file<P: AsRef<Path>>(path: P, records: &[OutputRecord]) -> ExportResult<()> {
    let file = std::fs::File::create(path)?;
    write_csv(std::io::BufWriter::new(file), records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(debtor: &str, kind: &str, number: &str, date: &str, balance: &str) -> OutputRecord {
        OutputRecord {
            debtor_reference: debtor.into(),
            transaction_type: kind.into(),
            document_number: number.into(),
            document_date: date.into(),
            document_balance: balance.into(),
        }
    }

    #[test]
    fn test_header_and_rows() {
        let csv = serialize(&[record("D100", "CRD", "INV55", "01/02/2024", "1000.00")]).unwrap();

        assert_eq!(
            csv,
            "Debtor Reference,Transaction Type,Document Number,Document Date,Document Balance\n\
             D100,CRD,INV55,01/02/2024,1000.00\n"
        );
    }

    #[test]
    fn test_header_only_when_no_records() {
        let csv = serialize(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("Debtor Reference,"));
    }

    #[test]
    fn test_embedded_delimiters_are_quoted() {
        let csv = serialize(&[record("Smith, J", "INV", "say \"hi\"", "", "")]).unwrap();
        let line = csv.lines().nth(1).unwrap();
        assert_eq!(line, "\"Smith, J\",INV,\"say \"\"hi\"\"\",,");
    }

    #[test]
    fn test_download_metadata() {
        let artifact = download(&[]).unwrap();
        assert_eq!(artifact.file_name, "tynic_upload.csv");
        assert_eq!(artifact.mime_type, "text/csv");
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DOWNLOAD_FILE_NAME);
        write_file(&path, &[record("D1", "INV", "N1", "", "2.00")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("D1,INV,N1,,2.00\n"));
    }
}
