//! # Page Rasterization
//!
//! Driver seam between plan-set documents and the extraction pipeline.
//! A [`DocumentOpener`] backend turns raw document files into
//! [`PageDocument`]s that can render any page to a fixed-resolution
//! grayscale raster and report positioned text runs (used downstream for
//! scale-legend recognition).
//!
//! The production backend wraps pdfium behind the `pdf` cargo feature;
//! tests and embedders can provide their own opener.

#[cfg(feature = "pdf")]
pub mod pdfium;

use std::path::Path;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "pdf")]
pub use pdfium::PdfiumOpener;

#[derive(Error, Debug)]
pub enum RasterizeError {
    #[error("Rendering backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Failed to decode document: {0}")]
    Decode(String),

    #[error("Page {index} out of bounds ({count} pages)")]
    PageOutOfBounds { index: usize, count: usize },

    #[error("Failed to render page {index}: {reason}")]
    Render { index: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RasterizeError>;

/// One rendered page: the raster plus the page's native coordinate-space
/// dimensions (page units, 72 per inch for PDF).
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub gray: GrayImage,
    pub page_width: f64,
    pub page_height: f64,
    pub dpi: f64,
}

impl PageRaster {
    /// Scale factor from raster pixels to page units.
    pub fn pixels_to_page_units(&self) -> f64 {
        self.page_width / f64::from(self.gray.width())
    }
}

/// A positioned text span, in raster pixel coordinates at the dpi the page
/// was rasterized at. `x`/`y` is the span's center with y growing downward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// An opened multi-page document.
pub trait PageDocument {
    fn page_count(&self) -> usize;

    /// Render one page to grayscale at the given resolution.
    fn rasterize(&self, index: usize, dpi: f64) -> Result<PageRaster>;

    /// Positioned text runs for one page, in raster pixel coordinates at
    /// the given dpi. Backends without text extraction return an empty list.
    fn text_runs(&self, index: usize, dpi: f64) -> Result<Vec<TextRun>>;
}

/// Backend factory for opening documents. Opening validates the document;
/// an unreadable file or missing rendering library fails here.
pub trait DocumentOpener: Send + Sync + 'static {
    type Document: PageDocument;

    fn open(&self, path: &Path) -> Result<Self::Document>;
}

/// Convert a PDF-space point (origin bottom-left, 72 units per inch) to
/// raster pixel coordinates (origin top-left) at the given dpi.
pub fn page_point_to_raster(x: f64, y: f64, page_height: f64, dpi: f64) -> [f64; 2] {
    let scale = dpi / 72.0;
    [x * scale, (page_height - y) * scale]
}
