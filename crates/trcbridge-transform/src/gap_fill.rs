//! Gap filling along the frame axis.
//!
//! Missing values between two known samples are linearly interpolated
//! against the frame index (so uneven frame spacing is respected).  Leading
//! and trailing gaps hold the nearest known value, which leaves no column of
//! a non-empty track unresolved.
//!
//! # Example
//!
//! ```rust
//! use trcbridge_transform::gap_fill::fill_column;
//!
//! let frames = [0, 1, 2, 3];
//! let mut values = [None, Some(2.0), None, Some(4.0)];
//! assert_eq!(fill_column(&frames, &mut values), Some(2));
//! assert_eq!(values, [Some(2.0), Some(2.0), Some(3.0), Some(4.0)]);
//! ```

use thiserror::Error;
use tracing::{debug, info};
use trcbridge_types::{Axis, Frame, MarkerName, MarkerTrack, TrajectoryTable};

/// A value that cannot be produced by interpolation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("marker {marker} has no {axis} value in any frame; nothing to interpolate from")]
    EmptyColumn { marker: MarkerName, axis: Axis },

    #[error("marker {marker} {axis} is still missing at frame {frame} after gap filling")]
    Unresolved {
        marker: MarkerName,
        axis: Axis,
        frame: Frame,
    },
}

/// Fill the gaps of one column in place.
///
/// Returns the number of filled values, or `None` when the column holds no
/// value at all (it is left untouched).
pub fn fill_column(frames: &[Frame], values: &mut [Option<f64>]) -> Option<usize> {
    debug_assert_eq!(frames.len(), values.len());

    let known: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_some()).collect();
    let (&first, &last) = (known.first()?, known.last()?);

    let mut filled = 0;
    let mut next_known = 0;
    for i in 0..values.len() {
        if values[i].is_some() {
            next_known += 1;
            continue;
        }
        let value = if i < first {
            values[first]
        } else if i > last {
            values[last]
        } else {
            // `known[next_known - 1] < i < known[next_known]`.
            let (lo, hi) = (known[next_known - 1], known[next_known]);
            let (v0, v1) = (values[lo]?, values[hi]?);
            let (f0, f1, f) = (
                f64::from(frames[lo]),
                f64::from(frames[hi]),
                f64::from(frames[i]),
            );
            Some(v0 + (v1 - v0) * (f - f0) / (f1 - f0))
        };
        values[i] = value;
        filled += 1;
    }
    Some(filled)
}

/// Fill every column of `track`.
///
/// A track with no value on any axis is skipped (returns `Ok(0)`); a track
/// that has values on some axes but none on another cannot be completed.
pub fn fill_track(frames: &[Frame], track: &mut MarkerTrack) -> Result<usize, InterpolationError> {
    if !track.has_any_value() {
        return Ok(0);
    }
    let mut filled = 0;
    for axis in Axis::ALL {
        filled += fill_column(frames, track.column_mut(axis)).ok_or_else(|| {
            InterpolationError::EmptyColumn {
                marker: track.name.clone(),
                axis,
            }
        })?;
    }
    if filled > 0 {
        debug!(marker = %track.name, filled, "filled gaps");
    }
    Ok(filled)
}

/// Fill every non-empty track of `table`; returns the number of filled
/// values.  Tracks without any value are left empty.
pub fn fill_table(table: &mut TrajectoryTable) -> Result<usize, InterpolationError> {
    let frames = table.frames().to_vec();
    let mut filled = 0;
    for track in table.markers_mut() {
        filled += fill_track(&frames, track)?;
    }
    if filled > 0 {
        info!(filled, "missing samples interpolated");
    }
    Ok(filled)
}

/// Confirm that no value of `track` is missing.
pub fn ensure_complete(frames: &[Frame], track: &MarkerTrack) -> Result<(), InterpolationError> {
    for axis in Axis::ALL {
        if let Some(row) = track.column(axis).iter().position(Option::is_none) {
            return Err(InterpolationError::Unresolved {
                marker: track.name.clone(),
                axis,
                frame: frames.get(row).copied().unwrap_or_default(),
            });
        }
    }
    Ok(())
}
