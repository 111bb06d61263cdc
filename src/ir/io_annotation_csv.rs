//! Per-image annotation CSV reader and writer.
//!
//! # Format
//!
//! One file per image, a header row, then one bounding box per data row:
//!
//! ```text
//! #item,x,y,width,height,label
//! 0,10,20,30,40,2
//! ```
//!
//! Older exports use `w`/`h`, `dx`/`dy` or `class`/`category_id` columns;
//! see [`super::record`] for how those are resolved. Rows whose `#item`
//! starts with `#` are comments.
//!
//! The reader is row-tolerant: a row that does not normalize is reported in
//! [`RecordBatch::malformed_rows`] and the remaining rows are still read.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::record::{normalize_row, AnnotationRecord, RawRow, RecordBatch, RowError, RowOutcome};
use crate::error::DatasetError;

/// Header written by [`write_annotation_csv`].
pub const CSV_HEADER: [&str; 6] = ["#item", "x", "y", "width", "height", "label"];

/// Reads every annotation record from a CSV file.
///
/// # Errors
/// Returns an error if the file cannot be opened, its header cannot be
/// read, or the underlying reader fails with an IO error mid-file.
pub fn read_annotation_csv(path: &Path) -> Result<RecordBatch, DatasetError> {
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
    parse_rows(BufReader::new(file), path)
}

/// Reads annotation records from a CSV string.
///
/// Useful for testing without file I/O.
pub fn from_annotation_csv_str(csv_str: &str) -> Result<RecordBatch, DatasetError> {
    from_annotation_csv_slice(csv_str.as_bytes())
}

/// Reads annotation records from CSV bytes.
pub fn from_annotation_csv_slice(bytes: &[u8]) -> Result<RecordBatch, DatasetError> {
    parse_rows(bytes, Path::new("<bytes>"))
}

/// Writes records as a per-image CSV file with the canonical header.
pub fn write_annotation_csv(path: &Path, records: &[AnnotationRecord]) -> Result<(), DatasetError> {
    let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_rows(&mut writer, records, path)?;
    writer.flush().map_err(|e| DatasetError::io(path, e))
}

/// Writes records to a CSV string.
pub fn to_annotation_csv_string(records: &[AnnotationRecord]) -> Result<String, DatasetError> {
    let dummy_path = Path::new("<string>");
    let mut bytes = Vec::new();
    write_rows(&mut bytes, records, dummy_path)?;
    String::from_utf8(bytes).map_err(|e| DatasetError::CsvWrite {
        path: dummy_path.to_path_buf(),
        source: csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
    })
}

fn parse_rows<R: Read>(reader: R, path: &Path) -> Result<RecordBatch, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|source| DatasetError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let mut batch = RecordBatch::default();

    for (index, result) in csv_reader.records().enumerate() {
        // Header is line 1.
        let fallback_line = index as u64 + 2;
        match result {
            Ok(record) => {
                let line = record.position().map_or(fallback_line, |p| p.line());
                batch.push_outcome(line, normalize_row(&RawRow::from_csv_record(&headers, &record)));
            }
            Err(err) if err.is_io_error() => {
                return Err(DatasetError::CsvParse {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
            Err(err) => {
                let line = err.position().map_or(fallback_line, |p| p.line());
                batch.push_outcome(
                    line,
                    RowOutcome::Malformed(RowError::Unreadable {
                        message: err.to_string(),
                    }),
                );
            }
        }
    }

    Ok(batch)
}

fn write_rows<W: Write>(
    writer: W,
    records: &[AnnotationRecord],
    path: &Path,
) -> Result<(), DatasetError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let to_err = |source| DatasetError::CsvWrite {
        path: path.to_path_buf(),
        source,
    };

    csv_writer.write_record(CSV_HEADER).map_err(to_err)?;
    for record in records {
        let [x, y, w, h] = record.bbox.to_array();
        csv_writer
            .write_record([
                record.item.to_string(),
                x.to_string(),
                y.to_string(),
                w.to_string(),
                h.to_string(),
                record.label.to_string(),
            ])
            .map_err(to_err)?;
    }
    csv_writer.flush().map_err(|e| DatasetError::io(path, e))
}
