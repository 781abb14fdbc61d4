//! `trcbridge-types` – shared data model for the trajectory pipeline.
//!
//! Everything that flows between the importer, the transform stage and the
//! TRC writer is defined here so the crates agree on one vocabulary.
//!
//! # Modules
//!
//! - [`table`] – [`TrajectoryTable`][table::TrajectoryTable]: frame-keyed,
//!   marker-indexed table of 3-D samples with optional gaps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod table;

pub use table::{MarkerTrack, TrajectoryTable};

/// Integer index of one temporal sample.  Frames start at the source's
/// first index, which is not necessarily 1.
pub type Frame = u32;

/// Identifier of one physical or virtual tracking point (e.g. `"LASIS"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerName(String);

impl MarkerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Flat column name for one axis of this marker, e.g. `LASIS_X`.
    pub fn column_name(&self, axis: Axis) -> String {
        format!("{}_{}", self.0, axis)
    }
}

impl fmt::Display for MarkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarkerName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MarkerName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for MarkerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One of the three Cartesian axes, in canonical X, Y, Z order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in column order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Position of this axis inside an `[_; 3]` triple.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a token is not one of `X`, `Y`, `Z` (case-insensitive).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown axis label {0:?}")]
pub struct UnknownAxis(pub String);

impl FromStr for Axis {
    type Err = UnknownAxis;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "X" | "x" => Ok(Axis::X),
            "Y" | "y" => Ok(Axis::Y),
            "Z" | "z" => Ok(Axis::Z),
            other => Err(UnknownAxis(other.to_string())),
        }
    }
}

/// Coordinates of one marker at one frame.  Any component may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    pub fn from_array(values: [Option<f64>; 3]) -> Self {
        Self {
            x: values[0],
            y: values[1],
            z: values[2],
        }
    }

    pub fn to_array(self) -> [Option<f64>; 3] {
        [self.x, self.y, self.z]
    }

    /// The three components if none is missing.
    pub fn complete(&self) -> Option<[f64; 3]> {
        Some([self.x?, self.y?, self.z?])
    }

    pub fn is_missing(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }
}

/// Violations of the [`TrajectoryTable`] structural invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("column {marker}_{axis} has {found} values but the table has {expected} frames")]
    LengthMismatch {
        marker: MarkerName,
        axis: Axis,
        expected: usize,
        found: usize,
    },

    #[error("frame {frame} does not follow frame {previous}; frames must be strictly increasing")]
    FrameOrder { frame: Frame, previous: Frame },

    #[error("marker {marker} appears more than once")]
    DuplicateMarker { marker: MarkerName },
}
