pub mod builder;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Result,
    traits::{ContourTracer, Frame, PagePreprocessor, RegionExtractor, RegionFilter},
    types::Region,
};

/// Knobs for the standard extraction pipeline. Defaults are tuned for
/// 300 dpi civil plan sheets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractConfig {
    pub blur_sigma: f32,
    pub ink_threshold: u8,
    pub canny_low: f32,
    pub canny_high: f32,
    pub closing_radius: u8,
    pub opening_radius: u8,
    /// Douglas-Peucker deviation tolerance in pixels.
    pub simplify_epsilon: f64,
    /// Minimum-noise pixel area; smaller regions are discarded.
    pub min_area_px: f64,
    pub max_area_ratio: f64,
    pub max_span_ratio: f64,
    pub max_aspect: f64,
    pub dedup_overlap_ratio: f64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.4,
            ink_threshold: 200,
            canny_low: 50.0,
            canny_high: 150.0,
            closing_radius: 3,
            opening_radius: 1,
            simplify_epsilon: 2.0,
            min_area_px: 10_000.0,
            max_area_ratio: 0.35,
            max_span_ratio: 0.85,
            max_aspect: 15.0,
            dedup_overlap_ratio: 0.9,
        }
    }
}

/// A composable pipeline turning a grayscale page raster into candidate
/// surface regions. Pure and deterministic for fixed stages.
pub struct ExtractionPipeline {
    preprocessors: Vec<Box<dyn PagePreprocessor>>,
    tracer: Box<dyn ContourTracer>,
    filters: Vec<Box<dyn RegionFilter>>,
}

impl ExtractionPipeline {
    pub fn builder() -> builder::ExtractionPipelineBuilder {
        builder::ExtractionPipelineBuilder::new()
    }

    /// The standard sheet pipeline: blur, ink/edge binarization,
    /// morphological closing and opening, contour tracing, simplification,
    /// then the area/span/aspect/dedup filters.
    pub fn standard(config: &ExtractConfig) -> Self {
        builder::ExtractionPipelineBuilder::standard(config)
    }

    pub fn new(
        preprocessors: Vec<Box<dyn PagePreprocessor>>,
        tracer: Box<dyn ContourTracer>,
        filters: Vec<Box<dyn RegionFilter>>,
    ) -> Self {
        Self {
            preprocessors,
            tracer,
            filters,
        }
    }

    /// Run the full pipeline over one raster.
    pub fn process(&self, image: &GrayImage) -> Result<Vec<Region>> {
        let frame = Frame::of(image);

        let mut processed = image.clone();
        for preprocessor in &self.preprocessors {
            processed = preprocessor.preprocess(&processed)?;
        }

        let traced = self.tracer.trace(&processed)?;
        debug!(candidates = traced.len(), "traced contours");

        let mut regions = traced;
        for filter in &self.filters {
            regions = filter.apply(regions, &frame)?;
        }
        debug!(regions = regions.len(), "regions after filtering");

        Ok(regions)
    }
}

impl RegionExtractor for ExtractionPipeline {
    fn extract_regions(&self, image: &GrayImage) -> Result<Vec<Region>> {
        self.process(image)
    }
}
