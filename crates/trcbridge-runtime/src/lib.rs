//! `trcbridge-runtime` – end-to-end conversion runs.
//!
//! Wires the importer, merge and TRC writer into a single call and owns the
//! process-wide diagnostics setup used by the `trcbridge` binary.
//!
//! # Modules
//!
//! - [`pipeline`] – [`SubjectLayout`][pipeline::SubjectLayout] (file naming
//!   per subject), [`ConversionJob`][pipeline::ConversionJob] and
//!   [`convert`][pipeline::convert], which reads both exports, merges them
//!   and writes the TRC file.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   installs the global `tracing` subscriber, optionally exporting spans
//!   over OTLP when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
//!
//! Library code never reads environment variables or global state; every
//! path and option arrives through a [`ConversionJob`][pipeline::ConversionJob].

pub mod pipeline;
pub mod telemetry;

pub use pipeline::{ConversionJob, ConversionReport, ConvertError, SubjectLayout, convert};
