//! Column-wise union of the landmarks and targets tables.
//!
//! The two exports are outer-joined on frame: the merged frame set is the
//! sorted union of both, and every column is re-aligned to it, missing
//! wherever its own source had no row.  A marker name present in both
//! sources is ambiguous and rejected rather than silently overwritten.

use std::collections::{BTreeSet, HashSet};

use thiserror::Error;
use tracing::{debug, instrument, warn};
use trcbridge_types::{Axis, Frame, MarkerName, MarkerTrack, TableError, TrajectoryTable};

/// Failure to combine two tables.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error(
        "marker {marker} appears in both the landmarks and the targets export; \
         rename one of them so each output column has a single source"
    )]
    DuplicateMarker { marker: MarkerName },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Outer-join `landmarks` and `targets` on frame.
///
/// Landmark markers come first, then target markers, each in file order.
///
/// ```rust
/// use trcbridge_ingest::merge;
/// use trcbridge_types::{MarkerName, MarkerTrack, TrajectoryTable};
///
/// let lasis = MarkerTrack::new(MarkerName::from("LASIS"), None,
///     [vec![Some(1.0)], vec![Some(2.0)], vec![Some(3.0)]]);
/// let rhee = MarkerTrack::new(MarkerName::from("RHEE"), None,
///     [vec![Some(4.0)], vec![Some(5.0)], vec![Some(6.0)]]);
///
/// let landmarks = TrajectoryTable::new(vec![1], vec![lasis]).unwrap();
/// let targets = TrajectoryTable::new(vec![2], vec![rhee]).unwrap();
///
/// let merged = merge(landmarks, targets).unwrap();
/// assert_eq!(merged.frames(), [1, 2]);
/// assert!(merged.sample("RHEE", 1).unwrap().is_missing());
/// ```
#[instrument(skip_all, fields(
    landmarks = landmarks.markers().len(),
    targets = targets.markers().len()
))]
pub fn merge(
    landmarks: TrajectoryTable,
    targets: TrajectoryTable,
) -> Result<TrajectoryTable, MergeError> {
    let names: HashSet<&MarkerName> = landmarks.markers().iter().map(|m| &m.name).collect();
    if let Some(dup) = targets.markers().iter().find(|m| names.contains(&m.name)) {
        warn!(marker = %dup.name, "marker name present in both landmarks and targets");
        return Err(MergeError::DuplicateMarker {
            marker: dup.name.clone(),
        });
    }

    let frames: Vec<Frame> = landmarks
        .frames()
        .iter()
        .chain(targets.frames())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut tracks = Vec::with_capacity(landmarks.markers().len() + targets.markers().len());
    for source in [landmarks, targets] {
        let (source_frames, source_tracks) = source.into_parts();
        if source_frames == frames {
            tracks.extend(source_tracks);
            continue;
        }
        debug!(
            source_frames = source_frames.len(),
            merged_frames = frames.len(),
            "re-aligning columns to merged frames"
        );
        let rows: Vec<usize> = source_frames
            .iter()
            .filter_map(|f| frames.binary_search(f).ok())
            .collect();
        tracks.extend(source_tracks.into_iter().map(|t| realign(t, &rows, frames.len())));
    }

    Ok(TrajectoryTable::new(frames, tracks)?)
}

/// Spread `track` onto `len` rows; source row `i` lands on `rows[i]`.
fn realign(track: MarkerTrack, rows: &[usize], len: usize) -> MarkerTrack {
    let mut out = MarkerTrack::empty(track.name.clone(), track.origin.clone(), len);
    for axis in Axis::ALL {
        let target = out.column_mut(axis);
        for (&row, &value) in rows.iter().zip(track.column(axis)) {
            target[row] = value;
        }
    }
    out
}
