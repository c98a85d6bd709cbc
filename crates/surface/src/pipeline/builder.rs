use crate::{
    algorithms::{
        AreaBandFilter, AspectRatioFilter, BorderSpanFilter, GaussianBlurPreprocessor,
        InkAndEdgePreprocessor, MorphClosePreprocessor, MorphOpenPreprocessor,
        NestedDuplicateFilter, OuterContourTracer, SimplifyFilter,
    },
    pipeline::{ExtractConfig, ExtractionPipeline},
    traits::{ContourTracer, PagePreprocessor, RegionFilter},
};

/// Builder for extraction pipelines with a fluent API.
pub struct ExtractionPipelineBuilder {
    preprocessors: Vec<Box<dyn PagePreprocessor>>,
    tracer: Option<Box<dyn ContourTracer>>,
    filters: Vec<Box<dyn RegionFilter>>,
}

impl ExtractionPipelineBuilder {
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            tracer: None,
            filters: Vec::new(),
        }
    }

    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: PagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    pub fn set_tracer<T>(mut self, tracer: T) -> Self
    where
        T: ContourTracer + 'static,
    {
        self.tracer = Some(Box::new(tracer));
        self
    }

    pub fn add_filter<F>(mut self, filter: F) -> Self
    where
        F: RegionFilter + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    /// Add Douglas-Peucker simplification as a filter stage.
    pub fn with_simplification(self, epsilon: f64) -> Self {
        self.add_filter(SimplifyFilter { epsilon })
    }

    /// Add minimum-noise / maximum-share area filtering.
    pub fn with_area_band(self, min_area_px: f64, max_area_ratio: f64) -> Self {
        self.add_filter(AreaBandFilter { min_area_px, max_area_ratio })
    }

    /// Add nested-duplicate suppression.
    pub fn with_deduplication(self, min_overlap_ratio: f64) -> Self {
        self.add_filter(NestedDuplicateFilter { min_overlap_ratio })
    }

    pub fn build(self) -> ExtractionPipeline {
        let tracer = self
            .tracer
            .unwrap_or_else(|| Box::new(OuterContourTracer));
        ExtractionPipeline::new(self.preprocessors, tracer, self.filters)
    }

    /// Assemble the standard sheet pipeline from a config.
    pub fn standard(config: &ExtractConfig) -> ExtractionPipeline {
        Self::new()
            .add_preprocessor(GaussianBlurPreprocessor { sigma: config.blur_sigma })
            .add_preprocessor(InkAndEdgePreprocessor {
                ink_threshold: config.ink_threshold,
                canny_low: config.canny_low,
                canny_high: config.canny_high,
            })
            .add_preprocessor(MorphClosePreprocessor { radius: config.closing_radius })
            .add_preprocessor(MorphOpenPreprocessor { radius: config.opening_radius })
            .set_tracer(OuterContourTracer)
            .with_simplification(config.simplify_epsilon)
            .with_area_band(config.min_area_px, config.max_area_ratio)
            .add_filter(BorderSpanFilter { max_span_ratio: config.max_span_ratio })
            .add_filter(AspectRatioFilter { max_aspect: config.max_aspect })
            .with_deduplication(config.dedup_overlap_ratio)
            .build()
    }
}

impl Default for ExtractionPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
