//! Canonical annotation records and the field normalizer.
//!
//! Annotation sources on disk disagree about field names (`width` vs `w`
//! vs `dx`, `label` vs `class` vs `category_id`) and occasionally contain
//! rows that do not parse. Every source is reduced to [`AnnotationRecord`]
//! here, so the manifest builder only ever sees one shape.
//!
//! # Field resolution
//!
//! | canonical | keys tried, in order         | default |
//! |-----------|------------------------------|---------|
//! | item      | `#item`                      | 0       |
//! | x         | `x`                          | 0       |
//! | y         | `y`                          | 0       |
//! | width     | `width`, `w`, `dx`           | 0       |
//! | height    | `height`, `h`, `dy`          | 0       |
//! | label     | `label`, `class`, `category_id` | 1    |
//!
//! A key that is present but whose value does not parse makes the whole row
//! malformed; the next synonym is only consulted when the key is absent.
//! Box fields must be finite: `nan` and `inf` parse as floats but are
//! malformed here.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::bbox::BBox;
use super::ids::CategoryId;
use super::{io_annotation_csv, io_image_json};
use crate::error::DatasetError;

const ITEM_KEYS: &[&str] = &["#item"];
const X_KEYS: &[&str] = &["x"];
const Y_KEYS: &[&str] = &["y"];
const WIDTH_KEYS: &[&str] = &["width", "w", "dx"];
const HEIGHT_KEYS: &[&str] = &["height", "h", "dy"];
const LABEL_KEYS: &[&str] = &["label", "class", "category_id"];

const DEFAULT_LABEL: u64 = 1;

/// One normalized annotation: `{item, bbox, label}`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnnotationRecord {
    pub item: i64,
    pub bbox: BBox,
    pub label: CategoryId,
}

/// A raw annotation row with an arbitrary key set.
///
/// A key mapped to `None` is a declared column with no cell in this row
/// (a short CSV record, or a JSON `null`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRow {
    fields: BTreeMap<String, Option<String>>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.fields.insert(key.into(), value);
    }

    /// Builds a row where every key has a value.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Some(v.into())))
            .collect();
        Self { fields }
    }

    /// Pairs a CSV record with its header row.
    ///
    /// Header columns beyond the end of a short record map to `None`. Cells
    /// beyond the end of the header are ignored.
    pub fn from_csv_record(headers: &csv::StringRecord, record: &csv::StringRecord) -> Self {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(idx, key)| (key.to_string(), record.get(idx).map(str::to_string)))
            .collect();
        Self { fields }
    }

    /// Flattens a JSON object. Numbers and strings keep their textual form;
    /// `null` becomes `None`; nested values are kept as JSON text so they
    /// fail number parsing.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let fields = object
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                };
                (key.clone(), text)
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.fields.get(key).map(|v| v.as_deref())
    }
}

/// Why a row was dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowError {
    /// A field was present but its value is not a number.
    NotANumber { field: &'static str, value: String },
    /// A declared column had no cell in this row.
    MissingCell { field: &'static str },
    /// The row could not be read at all (bad encoding, broken quoting).
    Unreadable { message: String },
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::NotANumber { field, value } => {
                write!(f, "field '{}' is not a number: {:?}", field, value)
            }
            RowError::MissingCell { field } => write!(f, "field '{}' has no value", field),
            RowError::Unreadable { message } => write!(f, "unreadable row: {}", message),
        }
    }
}

/// Result of normalizing one row.
#[derive(Clone, Debug, PartialEq)]
pub enum RowOutcome {
    Record(AnnotationRecord),
    /// The item field starts with `#`.
    Comment,
    Malformed(RowError),
}

/// Normalizes one raw row into a canonical record.
///
/// Pure: never touches the filesystem and never fails the caller.
pub fn normalize_row(row: &RawRow) -> RowOutcome {
    if let Some(Some(item)) = row.get("#item") {
        if item.starts_with('#') {
            return RowOutcome::Comment;
        }
    }

    match parse_record(row) {
        Ok(record) => RowOutcome::Record(record),
        Err(err) => RowOutcome::Malformed(err),
    }
}

fn parse_record(row: &RawRow) -> Result<AnnotationRecord, RowError> {
    let finite = |v: &f64| v.is_finite();
    let item = resolve::<i64>(row, ITEM_KEYS, 0, |_| true)?;
    let x = resolve(row, X_KEYS, 0.0, finite)?;
    let y = resolve(row, Y_KEYS, 0.0, finite)?;
    let width = resolve(row, WIDTH_KEYS, 0.0, finite)?;
    let height = resolve(row, HEIGHT_KEYS, 0.0, finite)?;
    let label = resolve::<u64>(row, LABEL_KEYS, DEFAULT_LABEL, |_| true)?;

    Ok(AnnotationRecord {
        item,
        bbox: BBox::from_xywh(x, y, width, height),
        label: CategoryId::new(label),
    })
}

/// Parses the first present key among `keys`, or returns `default` when
/// none is present. A parsed value rejected by `accept` counts as not a
/// number.
fn resolve<T: FromStr>(
    row: &RawRow,
    keys: &[&'static str],
    default: T,
    accept: impl Fn(&T) -> bool,
) -> Result<T, RowError> {
    for &key in keys {
        match row.get(key) {
            None => continue,
            Some(None) => return Err(RowError::MissingCell { field: key }),
            Some(Some(value)) => {
                return value
                    .trim()
                    .parse::<T>()
                    .ok()
                    .filter(|parsed| accept(parsed))
                    .ok_or_else(|| RowError::NotANumber {
                        field: key,
                        value: value.to_string(),
                    });
            }
        }
    }
    Ok(default)
}

/// A dropped row and where it was.
#[derive(Clone, Debug, PartialEq)]
pub struct MalformedRow {
    /// 1-based line in the source; 0 when the source has no lines.
    pub line: u64,
    pub error: RowError,
}

/// Everything read from one annotation source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordBatch {
    pub records: Vec<AnnotationRecord>,
    pub comment_rows: usize,
    pub malformed_rows: Vec<MalformedRow>,
}

impl RecordBatch {
    /// Folds one normalized row into the batch.
    pub fn push_outcome(&mut self, line: u64, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Record(record) => self.records.push(record),
            RowOutcome::Comment => self.comment_rows += 1,
            RowOutcome::Malformed(error) => {
                log::debug!("dropping row at line {}: {}", line, error);
                self.malformed_rows.push(MalformedRow { line, error });
            }
        }
    }
}

/// An on-disk annotation source for one image.
///
/// The builder and the reorganization flow only call [`AnnotationSource::load`];
/// which format sits behind it is decided when the source is located.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationSource {
    /// Per-image CSV with a header row and one annotation per data row.
    Csv(PathBuf),
    /// Per-image JSON with an embedded image/annotation/category triple.
    /// Its category ids are generated, so the label comes from the caller.
    ImageJson { path: PathBuf, label: CategoryId },
}

impl AnnotationSource {
    pub fn path(&self) -> &Path {
        match self {
            AnnotationSource::Csv(path) => path,
            AnnotationSource::ImageJson { path, .. } => path,
        }
    }

    /// Reads and normalizes every record in the source.
    ///
    /// # Errors
    /// Fails when the file cannot be opened or its overall structure is
    /// unusable. Individual bad rows never fail the load; they are returned
    /// in [`RecordBatch::malformed_rows`].
    pub fn load(&self) -> Result<RecordBatch, DatasetError> {
        match self {
            AnnotationSource::Csv(path) => io_annotation_csv::read_annotation_csv(path),
            AnnotationSource::ImageJson { path, label } => {
                let file = io_image_json::read_image_json(path)?;
                let record = file.primary_record(path, *label)?;
                Ok(RecordBatch {
                    records: vec![record],
                    ..Default::default()
                })
            }
        }
    }
}
