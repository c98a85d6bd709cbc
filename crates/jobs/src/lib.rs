//! # Analysis Jobs
//!
//! Async job orchestration over the surface-extraction pipeline: submit a
//! plan-set document, poll for progress, fetch the final report.
//!
//! A submitted document is validated, spilled to a temp file, and processed
//! sheet by sheet on a blocking worker while the [`registry::JobRegistry`]
//! serves consistent snapshots to pollers. The rendering backend is a
//! [`rasterize::DocumentOpener`] type parameter, so tests run against
//! synthetic documents and production against pdfium.

pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod report;

pub use error::{JobError, Result};
pub use orchestrator::{AnalysisConfig, Orchestrator};
pub use registry::{JobId, JobProgress, JobRegistry, JobSnapshot, JobStatus};
pub use report::{AnalysisReport, FlatPolygon};
