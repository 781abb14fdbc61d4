//! Writer options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trcbridge_transform::{AxisRemap, LengthUnit};
use trcbridge_types::MarkerTrack;

/// Labels written on the second marker header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AxisLabelStyle {
    /// `X1 Y1 Z1 X2 Y2 Z2 …` (1-based marker position).
    #[default]
    Indexed,
    /// `X Y Z X Y Z …`
    Plain,
    /// `XLASIS YLASIS ZLASIS …`
    MarkerSuffixed,
}

impl AxisLabelStyle {
    /// Labels for the marker at 0-based `position`.
    pub fn labels(self, position: usize, marker: &str) -> [String; 3] {
        match self {
            AxisLabelStyle::Indexed => {
                let n = position + 1;
                [format!("X{n}"), format!("Y{n}"), format!("Z{n}")]
            }
            AxisLabelStyle::Plain => ["X".into(), "Y".into(), "Z".into()],
            AxisLabelStyle::MarkerSuffixed => {
                [format!("X{marker}"), format!("Y{marker}"), format!("Z{marker}")]
            }
        }
    }
}

/// When a marker counts as present in the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceRule {
    /// At least one frame has X, Y and Z.
    #[default]
    AllAxes,
    /// At least one frame has any axis.
    AnyAxis,
}

impl PresenceRule {
    pub fn is_present(self, track: &MarkerTrack) -> bool {
        match self {
            PresenceRule::AllAxes => track.has_complete_sample(),
            PresenceRule::AnyAxis => track.has_any_value(),
        }
    }
}

/// What to do with markers that are not present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyMarkerPolicy {
    /// Keep the marker and write blank coordinate fields.  Never zeros.
    #[default]
    Blank,
    /// Leave the marker out of the file entirely.
    Omit,
}

/// `Display` / `FromStr` through the kebab-case names used in configuration.
macro_rules! kebab_names {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $($ty::$variant => $name,)+
                })
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(format!(
                        "unknown {} {other:?} (expected one of: {})",
                        stringify!($ty),
                        [$($name),+].join(", ")
                    )),
                }
            }
        }
    };
}

kebab_names!(AxisLabelStyle {
    Indexed => "indexed",
    Plain => "plain",
    MarkerSuffixed => "marker-suffixed",
});
kebab_names!(PresenceRule { AllAxes => "all-axes", AnyAxis => "any-axis" });
kebab_names!(EmptyMarkerPolicy { Blank => "blank", Omit => "omit" });

/// Everything the writer needs besides the table and the output path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrcOptions {
    /// Sampling rate in Hz; written as data, camera and original rate.
    pub frame_rate: f64,
    /// Unit of the incoming coordinates.
    pub source_unit: LengthUnit,
    /// Unit written to the file.
    pub output_unit: LengthUnit,
    /// Capture convention → simulation convention.
    pub remap: AxisRemap,
    pub axis_labels: AxisLabelStyle,
    pub presence: PresenceRule,
    pub empty_markers: EmptyMarkerPolicy,
    /// Decimal places of the `Time` column.
    pub time_precision: usize,
    /// Decimal places of coordinate values.
    pub coordinate_precision: usize,
}

impl Default for TrcOptions {
    fn default() -> Self {
        Self {
            frame_rate: 100.0,
            source_unit: LengthUnit::Meters,
            output_unit: LengthUnit::Millimeters,
            remap: AxisRemap::Z_UP_TO_Y_UP,
            axis_labels: AxisLabelStyle::default(),
            presence: PresenceRule::default(),
            empty_markers: EmptyMarkerPolicy::default(),
            time_precision: 4,
            coordinate_precision: 6,
        }
    }
}
