//! `trcbridge-writer` – TRC (Track Row Column) emission.
//!
//! Takes a merged [`TrajectoryTable`][trcbridge_types::TrajectoryTable],
//! conditions it (gap filling, unit scaling, axis remap) and serialises the
//! fixed tab-separated TRC layout consumed by musculoskeletal simulation
//! tools.
//!
//! # Modules
//!
//! - [`options`] – [`TrcOptions`][options::TrcOptions] and the policy enums
//!   that select header conventions and empty-marker handling.
//! - [`document`] – [`TrcDocument`][document::TrcDocument]: in-memory TRC
//!   layout and its text rendering.
//! - [`writer`] – [`TrcWriter`][writer::TrcWriter]: the conditioning
//!   pipeline plus atomic file output.

pub mod document;
pub mod options;
pub mod writer;

pub use document::TrcDocument;
pub use options::{AxisLabelStyle, EmptyMarkerPolicy, PresenceRule, TrcOptions};
pub use writer::{TrcError, TrcSummary, TrcWriter, WriteError};
