//! # Surface Extraction Library
//!
//! Turns rasterized plan-set pages into classified, area-measured surface
//! polygons for drainage and landscape-coverage reporting.
//!
//! ## Core Features
//!
//! - **Trait-based Architecture**: preprocessing, contour tracing, and
//!   region filtering are seams, composed into a pipeline
//! - **Heuristic Classification**: an ordered, data-driven rule table maps
//!   interior texture statistics to surface categories with a margin-based
//!   confidence score
//! - **Scale Calibration**: text-legend and graphical scale-bar strategies
//!   with a documented fallback, tagged with provenance
//! - **Quality Flagging**: deterministic review rules with configurable
//!   thresholds
//! - **GeoJSON Support**: round-trip-capable polygon export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use surface::pipeline::{ExtractConfig, ExtractionPipeline};
//! use surface::classify::SurfaceClassifier;
//!
//! let gray = image::open("sheet.png")?.to_luma8();
//!
//! let pipeline = ExtractionPipeline::standard(&ExtractConfig::default());
//! let regions = pipeline.process(&gray)?;
//!
//! let classifier = SurfaceClassifier::default();
//! for region in &regions {
//!     let class = classifier.classify_region(&gray, region);
//!     println!("{} ({:.2})", class.category, class.confidence);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod classify;
pub mod scale;
pub mod area;
pub mod quality;
pub mod io;

// Re-exports for convenience
pub use error::{Result, SurfaceError};
pub use types::{
    Region, ScaleCalibration, ScaleProvenance, Sheet, SheetTotals, SurfaceCategory, SurfacePolygon,
};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{builder::ExtractionPipelineBuilder, ExtractConfig, ExtractionPipeline};
pub use classify::{Classification, RuleTable, SurfaceClassifier, SurfaceDescriptor};
pub use scale::{ScaleDetector, ScaleLabel};
pub use area::{summarize, sheet_totals, Summary};
pub use quality::{QualityConfig, SheetAreaStats};

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// Dark filled block on a white background.
    fn create_test_sheet() -> GrayImage {
        let mut img = GrayImage::from_pixel(300, 300, Luma([255u8]));
        for y in 60..240 {
            for x in 60..240 {
                img.put_pixel(x, y, Luma([50u8]));
            }
        }
        img
    }

    #[test]
    fn extraction_to_classification_end_to_end() {
        let image = create_test_sheet();
        let config = ExtractConfig {
            min_area_px: 1_000.0,
            max_area_ratio: 0.9,
            max_span_ratio: 0.95,
            ..ExtractConfig::default()
        };

        let regions = ExtractionPipeline::standard(&config)
            .process(&image)
            .expect("pipeline should run");
        assert_eq!(regions.len(), 1);

        let classifier = SurfaceClassifier::default();
        let class = classifier.classify_region(&image, &regions[0]);
        assert_eq!(class.category, SurfaceCategory::Asphalt);
    }

    #[test]
    fn calibrated_area_flows_through() {
        let region = Region::new(vec![[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]]);
        let calibration = ScaleCalibration {
            pixels_per_foot: 10.0,
            provenance: ScaleProvenance::TextRecognized,
        };
        let sqft = calibration.pixel_area_to_sqft(region.pixel_area());
        assert!((sqft - 100.0).abs() < 1e-9);
    }
}
