//! Length units and conversion factors.
//!
//! The export tool writes coordinates in meters; the simulation package
//! expects millimeters.  Conversion goes through named constants rather than
//! bare literals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trcbridge_types::MarkerTrack;

/// Millimeters per meter.
pub const METERS_TO_MILLIMETERS: f64 = 1000.0;
/// Centimeters per meter.
pub const METERS_TO_CENTIMETERS: f64 = 100.0;

/// Unit of a coordinate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "cm")]
    Centimeters,
    #[serde(rename = "mm")]
    Millimeters,
}

impl LengthUnit {
    /// How many of this unit make up one meter.
    pub fn per_meter(self) -> f64 {
        match self {
            LengthUnit::Meters => 1.0,
            LengthUnit::Centimeters => METERS_TO_CENTIMETERS,
            LengthUnit::Millimeters => METERS_TO_MILLIMETERS,
        }
    }

    /// Multiplier converting a value in `self` into `target`.
    pub fn factor_to(self, target: LengthUnit) -> f64 {
        if self == target {
            1.0
        } else {
            target.per_meter() / self.per_meter()
        }
    }

    /// Symbol written to the TRC `Units` field.
    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Meters => "m",
            LengthUnit::Centimeters => "cm",
            LengthUnit::Millimeters => "mm",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "meter" | "meters" => Ok(LengthUnit::Meters),
            "cm" | "centimeter" | "centimeters" => Ok(LengthUnit::Centimeters),
            "mm" | "millimeter" | "millimeters" => Ok(LengthUnit::Millimeters),
            other => Err(format!("unknown length unit {other:?} (expected m, cm or mm)")),
        }
    }
}

/// Multiply every value of `track` by `factor`.
pub fn scale_track(track: &mut MarkerTrack, factor: f64) {
    if factor == 1.0 {
        return;
    }
    for axis in trcbridge_types::Axis::ALL {
        for value in track.column_mut(axis).iter_mut().flatten() {
            *value *= factor;
        }
    }
}
