//! Export file reader.
//!
//! [`read_export`] reads the fixed header block with a line reader, derives
//! the synthetic `Frame`, `{Marker}_{Axis}` columns from it, then hands the
//! remaining lines to a tab-delimited `csv` reader.  Every failure carries the
//! file path and, for body rows, the 1-based line number.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use trcbridge_ingest::{ExportLayout, ImportOptions, read_export};
//!
//! let options = ImportOptions { layout: ExportLayout::Grouped, origin: None };
//! let table = read_export(Path::new("s1_landmarks.tsv"), &options)?;
//! println!("{} markers over {} frames", table.markers().len(), table.len());
//! # Ok::<(), trcbridge_ingest::ParseError>(())
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};
use trcbridge_types::{Frame, MarkerTrack, TableError, TrajectoryTable};

use crate::header::{ExportHeader, ExportLayout, HeaderError, is_axis_row};

// ────────────────────────────────────────────────────────────────────────────
// Options & errors
// ────────────────────────────────────────────────────────────────────────────

/// How to interpret an export file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    #[serde(default)]
    pub layout: ExportLayout,
    /// Keep only columns tagged with this origin (tagged layout).
    #[serde(default)]
    pub origin: Option<String>,
}

/// Failure to turn an export file into a [`TrajectoryTable`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: header is truncated; expected {expected} header lines, found {found}", .path.display())]
    TruncatedHeader {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("{}: malformed header: {source}", .path.display())]
    Header {
        path: PathBuf,
        #[source]
        source: HeaderError,
    },

    #[error("{}:{line}: row has {found} columns; header defines {expected}", .path.display())]
    ColumnCount {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("{}:{line}: frame index {value:?} is not a non-negative integer", .path.display())]
    InvalidFrame {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{}:{line}: frame {frame} does not follow frame {previous}", .path.display())]
    FrameOrder {
        path: PathBuf,
        line: u64,
        frame: Frame,
        previous: Frame,
    },

    #[error("{}:{line}: column {column} holds non-numeric value {value:?}", .path.display())]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("{}: export contains no data rows", .path.display())]
    NoData { path: PathBuf },

    #[error("{}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", .path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Reader
// ────────────────────────────────────────────────────────────────────────────

/// Read one export file into a [`TrajectoryTable`] keyed by frame.
///
/// Frames must be strictly increasing; gaps between them are kept as-is.
/// Blank, `NaN` and `nan` fields become missing values.
#[instrument(skip_all, fields(path = %path.display(), layout = %options.layout))]
pub fn read_export(path: &Path, options: &ImportOptions) -> Result<TrajectoryTable, ParseError> {
    let file = File::open(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_from(BufReader::new(file), path, options)?;
    info!(
        markers = table.markers().len(),
        frames = table.len(),
        start_frame = ?table.start_frame(),
        "imported export"
    );
    Ok(table)
}

/// Parse an export from any buffered reader; `path` is only used for error
/// context.
pub fn read_from<R: BufRead>(
    mut reader: R,
    path: &Path,
    options: &ImportOptions,
) -> Result<TrajectoryTable, ParseError> {
    let io_err = |source: io::Error| ParseError::Io {
        path: path.to_path_buf(),
        source,
    };

    let expected = options.layout.header_lines();
    let mut lines = Vec::with_capacity(expected);
    while lines.len() < expected {
        let mut line = String::new();
        if reader.read_line(&mut line).map_err(io_err)? == 0 {
            return Err(ParseError::TruncatedHeader {
                path: path.to_path_buf(),
                expected,
                found: lines.len(),
            });
        }
        lines.push(line);
    }

    let header = ExportHeader::parse(options.layout, &lines, options.origin.as_deref())
        .map_err(|source| ParseError::Header {
            path: path.to_path_buf(),
            source,
        })?;
    let mut consumed = expected as u64;

    // Grouped exports may follow the header with an `ITEM  X  Y  Z` row.
    let mut pending = String::new();
    if options.layout == ExportLayout::Grouped {
        reader.read_line(&mut pending).map_err(io_err)?;
        if is_axis_row(&pending) {
            header
                .check_axis_row(&pending)
                .map_err(|source| ParseError::Header {
                    path: path.to_path_buf(),
                    source,
                })?;
            consumed += 1;
            pending.clear();
        }
    }

    let body = Cursor::new(pending.into_bytes()).chain(reader);
    parse_body(body, path, &header, consumed)
}

fn parse_body<R: Read>(
    body: R,
    path: &Path,
    header: &ExportHeader,
    consumed: u64,
) -> Result<TrajectoryTable, ParseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(body);

    let width = header.width();
    let mut frames: Vec<Frame> = Vec::new();
    let mut columns: Vec<[Vec<Option<f64>>; 3]> =
        vec![[Vec::new(), Vec::new(), Vec::new()]; header.markers().len()];

    for record in csv_reader.records() {
        let record = record.map_err(|source| ParseError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = consumed + record.position().map_or(0, |p| p.line());

        let mut fields: Vec<&str> = record.iter().collect();
        while fields.len() > width && fields.last().is_some_and(|f| f.trim().is_empty()) {
            fields.pop();
        }
        if fields.len() != width {
            return Err(ParseError::ColumnCount {
                path: path.to_path_buf(),
                line,
                expected: width,
                found: fields.len(),
            });
        }

        let raw_frame = fields[0].trim();
        let frame: Frame = raw_frame.parse().map_err(|_| ParseError::InvalidFrame {
            path: path.to_path_buf(),
            line,
            value: raw_frame.to_string(),
        })?;
        if let Some(&previous) = frames.last()
            && frame <= previous
        {
            return Err(ParseError::FrameOrder {
                path: path.to_path_buf(),
                line,
                frame,
                previous,
            });
        }
        frames.push(frame);

        for (marker, cols) in header.markers().iter().zip(columns.iter_mut()) {
            for (axis_idx, &field) in marker.fields.iter().enumerate() {
                let value = parse_value(fields[field]).map_err(|raw| ParseError::InvalidValue {
                    path: path.to_path_buf(),
                    line,
                    column: header.field_name(field),
                    value: raw,
                })?;
                cols[axis_idx].push(value);
            }
        }
    }

    if frames.is_empty() {
        return Err(ParseError::NoData {
            path: path.to_path_buf(),
        });
    }

    let tracks = header
        .markers()
        .iter()
        .zip(columns)
        .map(|(m, axes)| MarkerTrack::new(m.name.clone(), m.origin.clone(), axes))
        .collect();

    TrajectoryTable::new(frames, tracks).map_err(|source| ParseError::Table {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse one coordinate field.  Blank and NaN fields are missing.
fn parse_value(raw: &str) -> Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(trimmed.to_string()),
    }
}
