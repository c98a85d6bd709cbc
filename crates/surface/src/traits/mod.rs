use image::GrayImage;

use crate::{error::Result, types::Region};

/// Raster dimensions threaded through the filter stages, so size-relative
/// rules (border spans, maximum area ratio) can be evaluated.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn of(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    pub fn pixel_area(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }
}

/// Trait for raster preprocessing stages (blur, threshold, morphology).
pub trait PagePreprocessor: Send + Sync {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for tracing closed boundaries out of a binary raster.
pub trait ContourTracer: Send + Sync {
    fn trace(&self, binary: &GrayImage) -> Result<Vec<Region>>;
}

/// Trait for region-level filter/transform stages run after tracing.
pub trait RegionFilter: Send + Sync {
    fn apply(&self, regions: Vec<Region>, frame: &Frame) -> Result<Vec<Region>>;
}

/// Main trait for turning a grayscale page raster into candidate regions.
pub trait RegionExtractor: Send + Sync {
    fn extract_regions(&self, image: &GrayImage) -> Result<Vec<Region>>;
}
