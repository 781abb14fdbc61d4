//! `trcbridge-ingest` – reads marker trajectory exports.
//!
//! Turns the analysis tool's tab-separated landmark/target exports into
//! [`TrajectoryTable`][trcbridge_types::TrajectoryTable]s and joins them into
//! one frame-aligned table.
//!
//! # Modules
//!
//! - [`header`] – [`ExportLayout`][header::ExportLayout] and the header
//!   parsers that derive marker names and per-column placement.
//! - [`reader`] – [`read_export`][reader::read_export]: header + numeric body
//!   parsing with line-level error context.
//! - [`merge`] – [`merge`][merge::merge]: outer join of two tables on frame,
//!   refusing ambiguous marker names.

pub mod header;
pub mod merge;
pub mod reader;

pub use header::{ExportHeader, ExportLayout, HeaderError};
pub use merge::{MergeError, merge};
pub use reader::{ImportOptions, ParseError, read_export};
