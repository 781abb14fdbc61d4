//! One conversion run: two exports in, one TRC file out.
//!
//! # Example
//!
//! ```rust,no_run
//! use trcbridge_ingest::ExportLayout;
//! use trcbridge_runtime::{SubjectLayout, convert};
//! use trcbridge_writer::TrcOptions;
//!
//! let layout = SubjectLayout::new("s1", "data", "out").with_suffix("walking");
//! let job = layout.job(ExportLayout::Grouped, None, TrcOptions::default());
//! let report = convert(&job).unwrap();
//! println!("{} frames -> {}", report.frames, report.output.display());
//! ```

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};
use trcbridge_ingest::{ExportLayout, ImportOptions, MergeError, ParseError, merge, read_export};
use trcbridge_transform::InterpolationError;
use trcbridge_types::{Frame, MarkerName};
use trcbridge_writer::{TrcError, TrcOptions, TrcWriter, WriteError};

/// File name suffix of the landmark export.
pub const LANDMARKS_SUFFIX: &str = "_landmarks.tsv";
/// File name suffix of the target export.
pub const TARGETS_SUFFIX: &str = "_targets.tsv";
/// Extension of the written file.
pub const TRC_EXTENSION: &str = "trc";

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Anything that aborts a conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl From<TrcError> for ConvertError {
    fn from(err: TrcError) -> Self {
        match err {
            TrcError::Interpolation(e) => ConvertError::Interpolation(e),
            TrcError::Write(e) => ConvertError::Write(e),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Subject layout
// ────────────────────────────────────────────────────────────────────────────

/// Where a subject's exports live and where its TRC file goes.
///
/// ```text
/// {data_dir}/{id}_landmarks.tsv
/// {data_dir}/{id}_targets.tsv
/// {output_dir}/{id}[_{suffix}].trc
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectLayout {
    pub subject_id: String,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_suffix: Option<String>,
}

impl SubjectLayout {
    pub fn new(
        subject_id: impl Into<String>,
        data_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
            output_suffix: None,
        }
    }

    /// Append `_{suffix}` to the output file stem.  An empty suffix clears it.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.output_suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    pub fn landmarks_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}{LANDMARKS_SUFFIX}", self.subject_id))
    }

    pub fn targets_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}{TARGETS_SUFFIX}", self.subject_id))
    }

    pub fn output_path(&self) -> PathBuf {
        let stem = match &self.output_suffix {
            Some(suffix) => format!("{}_{suffix}", self.subject_id),
            None => self.subject_id.clone(),
        };
        self.output_dir.join(format!("{stem}.{TRC_EXTENSION}"))
    }

    /// A job converting this subject's exports.
    pub fn job(&self, layout: ExportLayout, origin: Option<String>, options: TrcOptions) -> ConversionJob {
        ConversionJob {
            landmarks: self.landmarks_path(),
            targets: self.targets_path(),
            output: self.output_path(),
            layout,
            origin,
            options,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Job & report
// ────────────────────────────────────────────────────────────────────────────

/// Fully resolved inputs of one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    pub landmarks: PathBuf,
    pub targets: PathBuf,
    pub output: PathBuf,
    /// Header convention of both exports.
    pub layout: ExportLayout,
    /// Origin tag to keep (tagged layout only).
    pub origin: Option<String>,
    pub options: TrcOptions,
}

impl ConversionJob {
    fn import_options(&self) -> ImportOptions {
        ImportOptions {
            layout: self.layout,
            origin: self.origin.clone(),
        }
    }
}

/// Outcome of a successful [`convert`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub output: PathBuf,
    pub landmark_markers: Vec<MarkerName>,
    pub target_markers: Vec<MarkerName>,
    /// Origin tags of the converted columns; empty for untagged exports.
    pub origins: Vec<String>,
    pub frames: usize,
    pub start_frame: Frame,
    pub blank_markers: Vec<MarkerName>,
    pub omitted_markers: Vec<MarkerName>,
    pub filled_samples: usize,
}

/// Read both exports, merge them on frame and write the TRC file.
#[instrument(skip_all, fields(
    landmarks = %job.landmarks.display(),
    targets = %job.targets.display(),
    output = %job.output.display(),
))]
pub fn convert(job: &ConversionJob) -> Result<ConversionReport, ConvertError> {
    let import = job.import_options();
    let landmarks = read_export(&job.landmarks, &import)?;
    let targets = read_export(&job.targets, &import)?;

    let landmark_markers = landmarks.marker_names();
    let target_markers = targets.marker_names();
    let mut origins = landmarks.origins();
    origins.extend(targets.origins());
    origins.sort();
    origins.dedup();
    let merged = merge(landmarks, targets)?;

    let summary = TrcWriter::new(job.options.clone()).write(&merged, &job.output)?;
    info!(
        frames = summary.frames,
        markers = summary.markers.len(),
        "conversion finished"
    );

    Ok(ConversionReport {
        output: summary.output,
        landmark_markers,
        target_markers,
        origins,
        frames: summary.frames,
        start_frame: summary.start_frame,
        blank_markers: summary.blank_markers,
        omitted_markers: summary.omitted_markers,
        filled_samples: summary.filled_samples,
    })
}
