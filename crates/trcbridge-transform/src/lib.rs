//! `trcbridge-transform` – numeric conditioning of trajectory tables.
//!
//! Everything that changes sample values between import and emission lives
//! here, independent of any file format.
//!
//! # Modules
//!
//! - [`gap_fill`] – linear interpolation of missing samples along the frame
//!   axis, holding the nearest value at both edges.
//! - [`units`] – [`LengthUnit`][units::LengthUnit] and the named conversion
//!   factors between them.
//! - [`remap`] – [`AxisRemap`][remap::AxisRemap]: signed 3×3 permutation
//!   matrix that re-expresses coordinates in another axis convention.
//! - [`convention`] – [`ConventionGraph`][convention::ConventionGraph]:
//!   directed graph of named coordinate conventions whose lookups compose
//!   remaps along the shortest path.

pub mod convention;
pub mod gap_fill;
pub mod remap;
pub mod units;

pub use convention::ConventionGraph;
pub use gap_fill::{InterpolationError, fill_table};
pub use remap::{AxisRemap, RemapError};
pub use units::{LengthUnit, METERS_TO_MILLIMETERS};
