use thiserror::Error;

use crate::registry::JobId;

#[derive(Error, Debug)]
pub enum JobError {
    /// Rejected at submission, before a job record exists.
    #[error("Invalid document: {0}")]
    Validation(String),

    /// Page rendering failed; this aborts the whole job.
    #[error(transparent)]
    Rasterization(#[from] rasterize::RasterizeError),

    #[error(transparent)]
    Surface(#[from] surface::SurfaceError),

    #[error("Unknown job: {0}")]
    NotFound(JobId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, JobError>;
