//! Pdfium-backed document rendering.
//!
//! Pdfium document handles borrow the library binding, so holding one
//! across calls would make [`PdfiumDocument`] self-referential. Instead the
//! document is reloaded from disk on each page operation; pdfium's loader
//! is cheap relative to rendering and the file lives in a temp location for
//! the duration of a job anyway.

use std::path::{Path, PathBuf};

use pdfium_render::prelude::{PdfDocument, PdfRenderConfig, Pdfium};
use tracing::debug;

use crate::{
    DocumentOpener, PageDocument, PageRaster, RasterizeError, Result, TextRun,
    page_point_to_raster,
};

/// Opens documents with the system pdfium library. Binding happens per
/// `open` call so a missing library surfaces as a per-job error rather
/// than a process-level failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumOpener;

impl DocumentOpener for PdfiumOpener {
    type Document = PdfiumDocument;

    fn open(&self, path: &Path) -> Result<Self::Document> {
        let pdfium = bind_pdfium()?;
        let page_count = {
            let document = load(&pdfium, path)?;
            document.pages().len() as usize
        };
        debug!(path = %path.display(), page_count, "opened document");
        Ok(PdfiumDocument {
            pdfium,
            path: path.to_path_buf(),
            page_count,
        })
    }
}

fn bind_pdfium() -> Result<Pdfium> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| RasterizeError::BackendUnavailable(e.to_string()))
}

fn load<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| RasterizeError::Decode(e.to_string()))
}

pub struct PdfiumDocument {
    pdfium: Pdfium,
    path: PathBuf,
    page_count: usize,
}

impl PdfiumDocument {
    fn check_bounds(&self, index: usize) -> Result<()> {
        if index >= self.page_count {
            return Err(RasterizeError::PageOutOfBounds {
                index,
                count: self.page_count,
            });
        }
        Ok(())
    }
}

impl PageDocument for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn rasterize(&self, index: usize, dpi: f64) -> Result<PageRaster> {
        self.check_bounds(index)?;
        let document = load(&self.pdfium, &self.path)?;
        let page = document
            .pages()
            .get(index as u16)
            .map_err(|e| RasterizeError::Render {
                index,
                reason: e.to_string(),
            })?;

        let page_width = f64::from(page.width().value);
        let page_height = f64::from(page.height().value);

        let config = PdfRenderConfig::new().scale_page_by_factor((dpi / 72.0) as f32);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| RasterizeError::Render {
                index,
                reason: e.to_string(),
            })?;
        let gray = bitmap.as_image().to_luma8();
        debug!(
            index,
            width = gray.width(),
            height = gray.height(),
            "rasterized page"
        );

        Ok(PageRaster {
            gray,
            page_width,
            page_height,
            dpi,
        })
    }

    fn text_runs(&self, index: usize, dpi: f64) -> Result<Vec<TextRun>> {
        self.check_bounds(index)?;
        let document = load(&self.pdfium, &self.path)?;
        let page = document
            .pages()
            .get(index as u16)
            .map_err(|e| RasterizeError::Render {
                index,
                reason: e.to_string(),
            })?;
        let page_height = f64::from(page.height().value);
        let text = page.text().map_err(|e| RasterizeError::Render {
            index,
            reason: e.to_string(),
        })?;

        let scale = dpi / 72.0;
        let mut runs = Vec::new();
        for segment in text.segments().iter() {
            let content = segment.text();
            if content.trim().is_empty() {
                continue;
            }
            let bounds = segment.bounds();
            let left = f64::from(bounds.left().value);
            let right = f64::from(bounds.right().value);
            let bottom = f64::from(bounds.bottom().value);
            let top = f64::from(bounds.top().value);
            let [x, y] = page_point_to_raster(
                (left + right) / 2.0,
                (bottom + top) / 2.0,
                page_height,
                dpi,
            );
            runs.push(TextRun {
                text: content,
                x,
                y,
                width: (right - left) * scale,
                height: (top - bottom) * scale,
            });
        }
        debug!(index, runs = runs.len(), "extracted text runs");
        Ok(runs)
    }
}
