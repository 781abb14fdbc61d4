//! Conditioning pipeline and atomic TRC output.
//!
//! [`TrcWriter::write`] runs, in order:
//!
//! 1. presence classification (blank or omit absent markers),
//! 2. gap filling of every present marker,
//! 3. unit conversion,
//! 4. axis remap,
//! 5. a completeness check while laying out the [`TrcDocument`],
//! 6. a write to a temporary file next to the target, renamed into place.
//!
//! The input table is never modified.  An existing output file is replaced
//! without warning; on failure the previous file (if any) is left untouched.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use trcbridge_transform::gap_fill::fill_table;
use trcbridge_transform::units::scale_track;
use trcbridge_transform::InterpolationError;
use trcbridge_types::{Frame, MarkerName, TrajectoryTable};

use crate::document::TrcDocument;
use crate::options::{EmptyMarkerPolicy, TrcOptions};

/// Failures while emitting the file.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("frame rate must be a positive finite number, got {0}")]
    InvalidFrameRate(f64),

    #[error("nothing to write: the table has no frames")]
    EmptyTable,

    #[error("cannot create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot move finished file into place at {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Anything that stops a table from becoming a TRC file.
#[derive(Error, Debug)]
pub enum TrcError {
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// What [`TrcWriter::write`] produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrcSummary {
    pub output: PathBuf,
    pub frames: usize,
    pub start_frame: Frame,
    /// Markers in file order, blank ones included.
    pub markers: Vec<MarkerName>,
    pub blank_markers: Vec<MarkerName>,
    pub omitted_markers: Vec<MarkerName>,
    /// Samples produced by gap filling.
    pub filled_samples: usize,
}

/// A table after presence, gap filling, scaling and remap.
#[derive(Debug, Clone)]
pub struct Conditioned {
    pub table: TrajectoryTable,
    pub omitted: Vec<MarkerName>,
    pub filled: usize,
}

/// Writes trajectory tables as TRC files.
#[derive(Debug, Clone, Default)]
pub struct TrcWriter {
    options: TrcOptions,
}

impl TrcWriter {
    pub fn new(options: TrcOptions) -> Self {
        Self { options }
    }

    /// Apply steps 1–4 of the pipeline to a copy of `table`.
    pub fn condition(&self, table: &TrajectoryTable) -> Result<Conditioned, TrcError> {
        let opts = &self.options;
        let mut table = table.clone();

        // ── Presence ─────────────────────────────────────────────────────────
        let mut omitted = Vec::new();
        match opts.empty_markers {
            EmptyMarkerPolicy::Blank => {
                for track in table.markers_mut() {
                    if !opts.presence.is_present(track) {
                        debug!(marker = %track.name, "marker not present; writing blank fields");
                        track.clear();
                    }
                }
            }
            EmptyMarkerPolicy::Omit => {
                table.retain_markers(|track| {
                    let keep = opts.presence.is_present(track);
                    if !keep {
                        omitted.push(track.name.clone());
                    }
                    keep
                });
                for name in &omitted {
                    warn!(marker = %name, "marker has no data; omitted from output");
                }
            }
        }

        // ── Gap fill ─────────────────────────────────────────────────────────
        let filled = fill_table(&mut table)?;

        // ── Units and axes ───────────────────────────────────────────────────
        let factor = opts.source_unit.factor_to(opts.output_unit);
        if opts.remap.determinant() < 0 {
            warn!(remap = %opts.remap, "axis remap mirrors handedness");
        }
        for track in table.markers_mut() {
            scale_track(track, factor);
            opts.remap.apply_to_track(track);
        }

        Ok(Conditioned {
            table,
            omitted,
            filled,
        })
    }

    /// Condition `table` and lay it out without touching the filesystem.
    pub fn prepare(
        &self,
        table: &TrajectoryTable,
        path_label: impl Into<String>,
    ) -> Result<(TrcDocument, Conditioned), TrcError> {
        self.validate(table)?;
        let conditioned = self.condition(table)?;
        let document = TrcDocument::build(&conditioned.table, &self.options, path_label)?;
        Ok((document, conditioned))
    }

    /// Convert `table` and write it to `path`.
    #[instrument(skip_all, fields(path = %path.display(), markers = table.markers().len(), frames = table.len()))]
    pub fn write(&self, table: &TrajectoryTable, path: &Path) -> Result<TrcSummary, TrcError> {
        let (document, conditioned) = self.prepare(table, path.display().to_string())?;
        persist(&document, path)?;

        let summary = TrcSummary {
            output: path.to_path_buf(),
            frames: document.frames.len(),
            start_frame: document.start_frame(),
            markers: document.markers.iter().map(|m| m.name.clone()).collect(),
            blank_markers: document.blank_markers(),
            omitted_markers: conditioned.omitted,
            filled_samples: conditioned.filled,
        };
        info!(
            markers = summary.markers.len(),
            blank = summary.blank_markers.len(),
            omitted = summary.omitted_markers.len(),
            start_frame = summary.start_frame,
            "TRC written"
        );
        Ok(summary)
    }

    fn validate(&self, table: &TrajectoryTable) -> Result<(), WriteError> {
        let rate = self.options.frame_rate;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(WriteError::InvalidFrameRate(rate));
        }
        if table.is_empty() {
            return Err(WriteError::EmptyTable);
        }
        Ok(())
    }
}

/// Write `document` to a temporary file beside `path`, then rename it over
/// `path`.  The temporary file is removed if anything fails first.
fn persist(document: &TrcDocument, path: &Path) -> Result<(), WriteError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let io_err = |source: io::Error| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".trcbridge-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        document.write_to(&mut out).map_err(io_err)?;
        out.flush().map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;

    tmp.persist(path).map_err(|e| WriteError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PresenceRule;
    use trcbridge_transform::{AxisRemap, LengthUnit};
    use trcbridge_types::{Axis, MarkerTrack};

    fn track(name: &str, xs: &[Option<f64>], ys: &[Option<f64>], zs: &[Option<f64>]) -> MarkerTrack {
        MarkerTrack::new(MarkerName::from(name), None, [xs.to_vec(), ys.to_vec(), zs.to_vec()])
    }

    /// LASIS at frames 0..=2 with a gap at frame 1.
    fn lasis_table() -> TrajectoryTable {
        let lasis = track(
            "LASIS",
            &[Some(1.0), None, Some(1.0)],
            &[Some(2.0), None, Some(4.0)],
            &[Some(3.0), None, Some(3.0)],
        );
        TrajectoryTable::new(vec![0, 1, 2], vec![lasis]).unwrap()
    }

    fn data_rows(text: &str) -> Vec<&str> {
        text.lines().skip(5).collect()
    }

    #[test]
    fn lasis_gap_becomes_interpolated_scaled_remapped_row() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("s1.trc");

        let summary = TrcWriter::default().write(&lasis_table(), &out).unwrap();
        let text = fs::read_to_string(&out).unwrap();

        assert_eq!(data_rows(&text)[1], "1\t0.0100\t1000.000000\t3000.000000\t-3000.000000");
        assert_eq!(data_rows(&text)[0], "0\t0.0000\t1000.000000\t3000.000000\t-2000.000000");
        assert_eq!(summary.filled_samples, 3);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.start_frame, 0);
        assert_eq!(summary.output, out);
    }

    #[test]
    fn header_reflects_output_path_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("s1.trc");
        TrcWriter::default().write(&lasis_table(), &out).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], format!("PathFileType\t4\t(X/Y/Z)\t{}", out.display()));
        assert_eq!(lines[2], "100\t100\t3\t1\tmm\t100\t0\t3");
        assert_eq!(lines[3], "Frame#\tTime\tLASIS");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn marker_count_survives_round_trip() {
        let a = track("A", &[Some(0.1)], &[Some(0.2)], &[Some(0.3)]);
        let b = track("B", &[Some(0.4)], &[Some(0.5)], &[Some(0.6)]);
        let c = MarkerTrack::empty(MarkerName::from("C"), None, 1);
        let table = TrajectoryTable::new(vec![10], vec![a, b, c]).unwrap();

        let (doc, _) = TrcWriter::default().prepare(&table, "mem.trc").unwrap();
        let text = doc.render();
        let header_markers = text.lines().nth(3).unwrap().split('\t').filter(|f| !f.is_empty()).count() - 2;
        assert_eq!(header_markers, 3);
        assert_eq!(text.lines().nth(2).unwrap().split('\t').nth(3), Some("3"));
    }

    #[test]
    fn time_is_frame_over_rate() {
        let t = track("T", &[Some(0.0); 3], &[Some(0.0); 3], &[Some(0.0); 3]);
        let table = TrajectoryTable::new(vec![5, 6, 7], vec![t]).unwrap();
        let writer = TrcWriter::new(TrcOptions { frame_rate: 200.0, ..TrcOptions::default() });

        let (doc, _) = writer.prepare(&table, "t.trc").unwrap();
        let text = doc.render();
        let times: Vec<&str> = data_rows(&text).iter().map(|r| r.split('\t').nth(1).unwrap()).collect();
        assert_eq!(times, ["0.0250", "0.0300", "0.0350"]);
    }

    #[test]
    fn units_and_remap_are_configurable() {
        let t = track("T", &[Some(1.0)], &[Some(2.0)], &[Some(3.0)]);
        let table = TrajectoryTable::new(vec![1], vec![t]).unwrap();
        let writer = TrcWriter::new(TrcOptions {
            output_unit: LengthUnit::Centimeters,
            remap: AxisRemap::IDENTITY,
            coordinate_precision: 1,
            ..TrcOptions::default()
        });

        let (doc, _) = writer.prepare(&table, "t.trc").unwrap();
        let text = doc.render();
        assert_eq!(data_rows(&text)[0], "1\t0.0100\t100.0\t200.0\t300.0");
        assert_eq!(text.lines().nth(2).unwrap().split('\t').nth(4), Some("cm"));
    }

    #[test]
    fn absent_marker_is_blank_by_default() {
        let present = track("P", &[Some(1.0)], &[Some(1.0)], &[Some(1.0)]);
        let partial = track("Q", &[Some(1.0)], &[None], &[None]);
        let table = TrajectoryTable::new(vec![1], vec![present, partial]).unwrap();

        let (doc, _) = TrcWriter::default().prepare(&table, "t.trc").unwrap();
        assert_eq!(doc.blank_markers(), [MarkerName::from("Q")]);
        let row = doc.render().lines().nth(5).unwrap().to_string();
        let blank: Vec<&str> = row.split('\t').skip(5).collect();
        assert_eq!(blank, ["", "", ""]);
    }

    #[test]
    fn absent_marker_can_be_omitted() {
        let present = track("P", &[Some(1.0)], &[Some(1.0)], &[Some(1.0)]);
        let ghost = MarkerTrack::empty(MarkerName::from("GHOST"), None, 1);
        let table = TrajectoryTable::new(vec![1], vec![present, ghost]).unwrap();
        let writer = TrcWriter::new(TrcOptions {
            empty_markers: EmptyMarkerPolicy::Omit,
            ..TrcOptions::default()
        });

        let dir = tempfile::tempdir().unwrap();
        let summary = writer.write(&table, &dir.path().join("t.trc")).unwrap();
        assert_eq!(summary.markers, [MarkerName::from("P")]);
        assert_eq!(summary.omitted_markers, [MarkerName::from("GHOST")]);
        assert!(summary.blank_markers.is_empty());
    }

    #[test]
    fn any_axis_presence_requires_every_axis_to_be_fillable() {
        let partial = track("Q", &[Some(1.0), None], &[None, None], &[Some(1.0), None]);
        let table = TrajectoryTable::new(vec![1, 2], vec![partial]).unwrap();
        let writer = TrcWriter::new(TrcOptions {
            presence: PresenceRule::AnyAxis,
            ..TrcOptions::default()
        });

        let err = writer.prepare(&table, "t.trc").unwrap_err();
        assert!(matches!(
            err,
            TrcError::Interpolation(InterpolationError::EmptyColumn { axis: Axis::Y, .. })
        ));
    }

    #[test]
    fn input_table_is_not_modified() {
        let table = lasis_table();
        let before = table.clone();
        TrcWriter::default().prepare(&table, "t.trc").unwrap();
        assert_eq!(table, before);
    }

    #[test]
    fn writing_twice_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("s1.trc");
        let writer = TrcWriter::default();

        writer.write(&lasis_table(), &out).unwrap();
        let first = fs::read(&out).unwrap();
        writer.write(&lasis_table(), &out).unwrap();
        let second = fs::read(&out).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn existing_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("s1.trc");
        fs::write(&out, "stale").unwrap();

        TrcWriter::default().write(&lasis_table(), &out).unwrap();
        assert!(fs::read_to_string(&out).unwrap().starts_with("PathFileType"));
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/deeper/s1.trc");
        TrcWriter::default().write(&lasis_table(), &out).unwrap();
        assert!(out.exists());
    }

    #[test]
    fn failure_leaves_no_file_behind() {
        let bad = track("BAD", &[Some(1.0)], &[None], &[Some(1.0)]);
        let table = TrajectoryTable::new(vec![1], vec![bad]).unwrap();
        let writer = TrcWriter::new(TrcOptions {
            presence: PresenceRule::AnyAxis,
            ..TrcOptions::default()
        });

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("s1.trc");
        assert!(writer.write(&table, &out).is_err());
        assert!(!out.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn uncreatable_output_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let out = blocker.join("s1.trc");

        let err = TrcWriter::default().write(&lasis_table(), &out).unwrap_err();
        match err {
            TrcError::Write(WriteError::CreateDir { path, .. }) => assert_eq!(path, blocker),
            other => panic!("expected CreateDir, got {other:?}"),
        }
        assert!(!out.exists());
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "not a directory");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn rejects_bad_frame_rate_and_empty_table() {
        let writer = TrcWriter::new(TrcOptions { frame_rate: 0.0, ..TrcOptions::default() });
        assert!(matches!(
            writer.prepare(&lasis_table(), "t.trc"),
            Err(TrcError::Write(WriteError::InvalidFrameRate(_)))
        ));

        let empty = TrajectoryTable::new(vec![], vec![]).unwrap();
        assert!(matches!(
            TrcWriter::default().prepare(&empty, "t.trc"),
            Err(TrcError::Write(WriteError::EmptyTable))
        ));
    }
}
