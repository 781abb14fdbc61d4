//! Axis remapping between coordinate conventions.
//!
//! Capture systems and simulation tools disagree on which axis points up and
//! on handedness.  An [`AxisRemap`] is a signed permutation matrix: every
//! output axis is exactly one input axis, possibly negated.  The remap is a
//! value handed to the writer, never arithmetic buried in it.
//!
//! # Example
//!
//! ```rust
//! use trcbridge_transform::AxisRemap;
//!
//! // Z-up capture data into a Y-up convention.
//! let remap = AxisRemap::Z_UP_TO_Y_UP;
//! assert_eq!(remap.apply([1.0, 2.0, 3.0]), [1.0, 3.0, -2.0]);
//!
//! // Same transform, written the way a config file spells it.
//! let parsed: AxisRemap = "x,z,-y".parse().unwrap();
//! assert_eq!(parsed, remap);
//! assert_eq!(remap.inverse().apply([1.0, 3.0, -2.0]), [1.0, 2.0, 3.0]);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use trcbridge_types::{Axis, MarkerTrack, Sample};

/// Invalid remap definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemapError {
    #[error("remap matrix {0:?} is not a signed permutation (each row and column needs exactly one ±1)")]
    NotSignedPermutation([[i8; 3]; 3]),

    #[error("cannot parse remap {input:?}: {reason}")]
    Parse { input: String, reason: String },
}

/// Signed permutation of the X, Y, Z axes.
///
/// Row `i` selects the input component that becomes output component `i`:
/// `out[i] = Σ rows[i][j] * in[j]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRemap {
    rows: [[i8; 3]; 3],
}

impl AxisRemap {
    /// Leaves coordinates untouched.
    pub const IDENTITY: Self = Self {
        rows: [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
    };

    /// Z-up capture convention to a Y-up convention:
    /// `out_x = in_x`, `out_y = in_z`, `out_z = -in_y`.
    pub const Z_UP_TO_Y_UP: Self = Self {
        rows: [[1, 0, 0], [0, 0, 1], [0, -1, 0]],
    };

    /// Build a remap from matrix rows, rejecting anything that is not a
    /// signed permutation.
    pub fn new(rows: [[i8; 3]; 3]) -> Result<Self, RemapError> {
        let unit_entries = |cells: [i8; 3]| {
            cells.iter().all(|c| (-1..=1).contains(c))
                && cells.iter().filter(|c| **c != 0).count() == 1
        };
        let columns = [0, 1, 2].map(|j| [rows[0][j], rows[1][j], rows[2][j]]);
        if rows.iter().all(|r| unit_entries(*r)) && columns.iter().all(|c| unit_entries(*c)) {
            Ok(Self { rows })
        } else {
            Err(RemapError::NotSignedPermutation(rows))
        }
    }

    pub fn rows(&self) -> [[i8; 3]; 3] {
        self.rows
    }

    /// Apply to one coordinate triple.
    pub fn apply(&self, v: [f64; 3]) -> [f64; 3] {
        self.rows.map(|row| {
            row.iter()
                .zip(v)
                .filter(|(c, _)| **c != 0)
                .map(|(c, x)| f64::from(*c) * x)
                .sum()
        })
    }

    /// Apply to a sample whose components may be missing; a missing input
    /// component stays missing on the output axis it maps to.
    pub fn apply_sample(&self, sample: Sample) -> Sample {
        let input = sample.to_array();
        Sample::from_array(self.rows.map(|row| {
            let (j, sign) = row
                .iter()
                .enumerate()
                .find(|(_, c)| **c != 0)
                .map(|(j, c)| (j, f64::from(*c)))
                .unwrap_or((0, 0.0));
            input[j].map(|x| sign * x)
        }))
    }

    /// Remap every row of `track` in place.
    pub fn apply_to_track(&self, track: &mut MarkerTrack) {
        if *self == Self::IDENTITY {
            return;
        }
        for row in 0..track.len() {
            let remapped = self.apply_sample(track.sample(row));
            track.set_sample(row, remapped);
        }
    }

    /// `self` followed by `next`.
    pub fn compose(self, next: Self) -> Self {
        let mut rows = [[0i8; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| next.rows[i][k] * self.rows[k][j]).sum();
            }
        }
        Self { rows }
    }

    /// Inverse transform (the transpose, for a signed permutation).
    pub fn inverse(self) -> Self {
        let r = self.rows;
        Self {
            rows: [0, 1, 2].map(|i| [r[0][i], r[1][i], r[2][i]]),
        }
    }

    /// `+1` for a proper rotation, `-1` when the remap mirrors handedness.
    pub fn determinant(&self) -> i8 {
        let m = self.rows;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }
}

impl Default for AxisRemap {
    fn default() -> Self {
        Self::Z_UP_TO_Y_UP
    }
}

impl fmt::Display for AxisRemap {
    /// Comma-separated source axis per output axis, e.g. `x,z,-y`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(Axis::ALL)
                    .find(|(c, _)| **c != 0)
                    .map(|(c, axis)| {
                        let name = axis.label().to_ascii_lowercase();
                        if *c < 0 { format!("-{name}") } else { name }
                    })
                    .unwrap_or_default()
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for AxisRemap {
    type Err = RemapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = |reason: String| RemapError::Parse {
            input: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(parse_err(format!("expected 3 components, found {}", parts.len())));
        }

        let mut rows = [[0i8; 3]; 3];
        for (row, part) in rows.iter_mut().zip(parts.iter().copied()) {
            let (sign, name) = match part.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, part.strip_prefix('+').unwrap_or(part)),
            };
            let axis: Axis = name.parse().map_err(|e| parse_err(format!("{e}")))?;
            row[axis.index()] = sign;
        }
        Self::new(rows)
    }
}

impl Serialize for AxisRemap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AxisRemap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
