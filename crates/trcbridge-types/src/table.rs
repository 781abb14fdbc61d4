//! Frame-keyed trajectory table.
//!
//! A [`TrajectoryTable`] stores an ordered, strictly increasing list of
//! frames and one [`MarkerTrack`] per marker.  Each track holds its X, Y and
//! Z columns aligned to the table frames, so the flat column view
//! (`Frame`, `LASIS_X`, `LASIS_Y`, `LASIS_Z`, …) is always recoverable.
//!
//! # Example
//!
//! ```rust
//! use trcbridge_types::{Axis, MarkerName, Sample, TrajectoryTable, MarkerTrack};
//!
//! let track = MarkerTrack::new(
//!     MarkerName::from("LASIS"),
//!     None,
//!     [vec![Some(1.0), None], vec![Some(2.0), None], vec![Some(3.0), None]],
//! );
//! let table = TrajectoryTable::new(vec![10, 11], vec![track]).unwrap();
//!
//! assert_eq!(table.start_frame(), Some(10));
//! assert_eq!(table.column_names(), ["Frame", "LASIS_X", "LASIS_Y", "LASIS_Z"]);
//! assert_eq!(table.sample("LASIS", 10), Some(Sample::new(1.0, 2.0, 3.0)));
//! assert_eq!(table.missing_count(), 3);
//! ```

use std::collections::{BTreeSet, HashSet};

use crate::{Axis, Frame, MarkerName, Sample, TableError};

// ────────────────────────────────────────────────────────────────────────────
// MarkerTrack
// ────────────────────────────────────────────────────────────────────────────

/// The three coordinate columns of one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerTrack {
    pub name: MarkerName,
    /// Source recording the columns came from, when the export tags it.
    pub origin: Option<String>,
    axes: [Vec<Option<f64>>; 3],
}

impl MarkerTrack {
    /// Create a track from X, Y and Z columns.
    pub fn new(name: MarkerName, origin: Option<String>, axes: [Vec<Option<f64>>; 3]) -> Self {
        Self { name, origin, axes }
    }

    /// A track of `len` rows with every value missing.
    pub fn empty(name: MarkerName, origin: Option<String>, len: usize) -> Self {
        Self::new(name, origin, [vec![None; len], vec![None; len], vec![None; len]])
    }

    pub fn column(&self, axis: Axis) -> &[Option<f64>] {
        &self.axes[axis.index()]
    }

    pub fn column_mut(&mut self, axis: Axis) -> &mut [Option<f64>] {
        &mut self.axes[axis.index()]
    }

    /// Number of rows in the X column (all columns agree inside a table).
    pub fn len(&self) -> usize {
        self.axes[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `row`; out-of-range rows read as missing.
    pub fn sample(&self, row: usize) -> Sample {
        Sample::from_array([
            self.axes[0].get(row).copied().flatten(),
            self.axes[1].get(row).copied().flatten(),
            self.axes[2].get(row).copied().flatten(),
        ])
    }

    /// Overwrite all three components at `row`.
    pub fn set_sample(&mut self, row: usize, sample: Sample) {
        for (column, value) in self.axes.iter_mut().zip(sample.to_array()) {
            if let Some(slot) = column.get_mut(row) {
                *slot = value;
            }
        }
    }

    /// True when at least one row has all three components.
    pub fn has_complete_sample(&self) -> bool {
        (0..self.len()).any(|row| self.sample(row).complete().is_some())
    }

    /// True when at least one value exists on any axis.
    pub fn has_any_value(&self) -> bool {
        self.axes.iter().flatten().any(Option::is_some)
    }

    pub fn missing_count(&self) -> usize {
        self.axes.iter().flatten().filter(|v| v.is_none()).count()
    }

    /// Drop every value, keeping the row count.
    pub fn clear(&mut self) {
        for column in &mut self.axes {
            column.iter_mut().for_each(|v| *v = None);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TrajectoryTable
// ────────────────────────────────────────────────────────────────────────────

/// Frame-indexed table of marker trajectories.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrajectoryTable {
    frames: Vec<Frame>,
    markers: Vec<MarkerTrack>,
}

impl TrajectoryTable {
    /// Build a table, checking that frames are strictly increasing, that
    /// every column has one value per frame, and that marker names are unique.
    pub fn new(frames: Vec<Frame>, markers: Vec<MarkerTrack>) -> Result<Self, TableError> {
        for pair in frames.windows(2) {
            if pair[1] <= pair[0] {
                return Err(TableError::FrameOrder {
                    frame: pair[1],
                    previous: pair[0],
                });
            }
        }

        let mut seen = HashSet::new();
        for track in &markers {
            if !seen.insert(track.name.clone()) {
                return Err(TableError::DuplicateMarker {
                    marker: track.name.clone(),
                });
            }
            for axis in Axis::ALL {
                let found = track.column(axis).len();
                if found != frames.len() {
                    return Err(TableError::LengthMismatch {
                        marker: track.name.clone(),
                        axis,
                        expected: frames.len(),
                        found,
                    });
                }
            }
        }

        Ok(Self { frames, markers })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn markers(&self) -> &[MarkerTrack] {
        &self.markers
    }

    /// Mutable access to the tracks.  The slice cannot change length, so the
    /// frame alignment invariant is preserved.
    pub fn markers_mut(&mut self) -> &mut [MarkerTrack] {
        &mut self.markers
    }

    pub fn marker(&self, name: &str) -> Option<&MarkerTrack> {
        self.markers.iter().find(|m| m.name.as_str() == name)
    }

    pub fn marker_names(&self) -> Vec<MarkerName> {
        self.markers.iter().map(|m| m.name.clone()).collect()
    }

    /// Row index of `frame`, if the table contains it.
    pub fn row_of(&self, frame: Frame) -> Option<usize> {
        self.frames.binary_search(&frame).ok()
    }

    pub fn sample(&self, marker: &str, frame: Frame) -> Option<Sample> {
        let row = self.row_of(frame)?;
        self.marker(marker).map(|m| m.sample(row))
    }

    pub fn start_frame(&self) -> Option<Frame> {
        self.frames.first().copied()
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Flat column headers: `Frame`, then `{Marker}_{Axis}` in marker order.
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once("Frame".to_string())
            .chain(
                self.markers
                    .iter()
                    .flat_map(|m| Axis::ALL.map(|axis| m.name.column_name(axis))),
            )
            .collect()
    }

    /// Distinct origin tags carried by the tracks, sorted.
    pub fn origins(&self) -> Vec<String> {
        self.markers
            .iter()
            .filter_map(|m| m.origin.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn retain_markers(&mut self, keep: impl FnMut(&MarkerTrack) -> bool) {
        self.markers.retain(keep);
    }

    /// Total number of missing values across all columns.
    pub fn missing_count(&self) -> usize {
        self.markers.iter().map(MarkerTrack::missing_count).sum()
    }

    pub fn into_parts(self) -> (Vec<Frame>, Vec<MarkerTrack>) {
        (self.frames, self.markers)
    }
}
