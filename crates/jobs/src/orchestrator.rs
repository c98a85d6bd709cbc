//! Job submission and the per-document worker.
//!
//! `submit` validates the upload, spills it to a named temp file, records a
//! queued job, and hands the heavy work to `spawn_blocking`; pollers read
//! registry snapshots while the worker runs. The temp file is owned by the
//! worker closure, so it is deleted on every terminal path.
//!
//! Error policy inside the worker: a page that cannot be rendered aborts
//! the job, while extraction or text-run failures degrade that sheet
//! (no polygons, fallback scale) and the job continues.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use rasterize::{DocumentOpener, PageDocument};
use surface::area::sheet_totals;
use surface::classify::{RuleTable, SurfaceClassifier};
use surface::pipeline::{ExtractConfig, ExtractionPipeline};
use surface::quality::{QualityConfig, SheetAreaStats};
use surface::scale::{ScaleDetector, ScaleLabel};
use surface::types::{round2, Sheet, SurfacePolygon};

use crate::error::{JobError, Result};
use crate::registry::{JobId, JobRegistry, JobSnapshot};
use crate::report::AnalysisReport;

/// Everything tunable about one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rasterization resolution for every sheet.
    pub dpi: f64,
    pub extract: ExtractConfig,
    pub quality: QualityConfig,
    pub scale: ScaleDetector,
    /// Classifier decision table. Set programmatically; not part of the
    /// serialized configuration surface.
    #[serde(skip)]
    pub rules: RuleTable,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dpi: 300.0,
            extract: ExtractConfig::default(),
            quality: QualityConfig::default(),
            scale: ScaleDetector::default(),
            rules: RuleTable::default(),
        }
    }
}

pub struct Orchestrator<O: DocumentOpener> {
    opener: Arc<O>,
    registry: Arc<JobRegistry>,
    config: AnalysisConfig,
}

impl<O: DocumentOpener> Orchestrator<O> {
    pub fn new(opener: O, config: AnalysisConfig) -> Self {
        Self {
            opener: Arc::new(opener),
            registry: Arc::new(JobRegistry::new()),
            config,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Validate and enqueue a document; processing happens on a blocking
    /// worker thread. Returns immediately with the job id.
    pub async fn submit(&self, bytes: &[u8]) -> Result<JobId> {
        if !bytes.starts_with(b"%PDF") {
            return Err(JobError::Validation(
                "uploaded file is not a PDF document".to_string(),
            ));
        }

        let mut temp = NamedTempFile::new()?;
        temp.write_all(bytes)?;
        temp.flush()?;

        let id = self.registry.create();
        info!(%id, bytes = bytes.len(), "job submitted");

        let opener = Arc::clone(&self.opener);
        let registry = Arc::clone(&self.registry);
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let outcome =
                process_document(opener.as_ref(), temp.path(), &config, &registry, id);
            match outcome {
                Ok(report) => {
                    info!(%id, sheets = report.sheets.len(), "job completed");
                    registry.complete(id, report);
                }
                Err(e) => {
                    warn!(%id, error = %e, "job failed");
                    registry.fail(id, e.to_string());
                }
            }
            // Temp file deleted here, on both outcomes.
            drop(temp);
        });

        Ok(id)
    }

    /// Current state of a job, including the report once completed.
    pub fn poll(&self, id: JobId) -> Result<JobSnapshot> {
        self.registry.get(id).ok_or(JobError::NotFound(id))
    }
}

fn process_document<O: DocumentOpener>(
    opener: &O,
    path: &Path,
    config: &AnalysisConfig,
    registry: &JobRegistry,
    id: JobId,
) -> Result<AnalysisReport> {
    let document = opener.open(path)?;
    let total_sheets = document.page_count();
    registry.mark_running(id, total_sheets);

    let pipeline = ExtractionPipeline::standard(&config.extract);
    let classifier = SurfaceClassifier::new(config.rules.clone());
    let mut detector = config.scale.clone();
    detector.dpi = config.dpi;

    let mut sheets = Vec::with_capacity(total_sheets);
    for index in 0..total_sheets {
        let sheet_number = index + 1;
        let raster = document.rasterize(index, config.dpi)?;

        let regions = match pipeline.process(&raster.gray) {
            Ok(regions) => regions,
            Err(e) => {
                warn!(sheet_number, error = %e, "extraction failed; sheet has no polygons");
                Vec::new()
            }
        };

        let labels: Vec<ScaleLabel> = match document.text_runs(index, config.dpi) {
            Ok(runs) => runs
                .into_iter()
                .map(|run| ScaleLabel {
                    text: run.text,
                    x: run.x,
                    y: run.y,
                })
                .collect(),
            Err(e) => {
                warn!(sheet_number, error = %e, "text extraction failed; scale from raster only");
                Vec::new()
            }
        };
        let calibration = detector.detect(&raster.gray, &labels);

        let measured: Vec<_> = regions
            .into_iter()
            .map(|region| {
                let classification = classifier.classify_region(&raster.gray, &region);
                let pixel_area = region.pixel_area();
                let area_sqft = round2(calibration.pixel_area_to_sqft(pixel_area));
                let compactness = region.compactness();
                (region, classification, pixel_area, area_sqft, compactness)
            })
            .collect();

        let areas: Vec<f64> = measured.iter().map(|m| m.3).collect();
        let stats = SheetAreaStats::from_areas(&areas);
        let to_page_units = raster.pixels_to_page_units();

        let polygons: Vec<SurfacePolygon> = measured
            .into_iter()
            .enumerate()
            .map(
                |(i, (region, classification, pixel_area, area_sqft, compactness))| {
                    let review_reasons = config.quality.review_reasons(
                        area_sqft,
                        compactness,
                        region.vertices.len(),
                        &stats,
                    );
                    SurfacePolygon {
                        id: format!("sheet{}_poly{}", sheet_number, i + 1),
                        vertex_count: region.vertices.len(),
                        vertices: region
                            .vertices
                            .into_iter()
                            .map(|[x, y]| [x * to_page_units, y * to_page_units])
                            .collect(),
                        category: classification.category,
                        confidence: classification.confidence,
                        pixel_area,
                        area_sqft,
                        compactness,
                        review_needed: !review_reasons.is_empty(),
                        review_reasons,
                    }
                },
            )
            .collect();

        let totals = sheet_totals(&polygons);
        sheets.push(Sheet {
            sheet_number,
            raster_dimensions: [raster.gray.width(), raster.gray.height()],
            page_dimensions: [raster.page_width, raster.page_height],
            calibration,
            polygons,
            sheet_totals: totals,
        });
        registry.set_progress(id, sheet_number);
    }

    Ok(AnalysisReport::from_sheets(sheets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use image::{GrayImage, Luma};

    use crate::registry::JobStatus;
    use rasterize::{PageRaster, RasterizeError, TextRun};
    use surface::types::{ScaleProvenance, SurfaceCategory};

    /// A page with one large uniform dark rectangle on white.
    fn dark_block_page() -> GrayImage {
        let mut img = GrayImage::from_pixel(800, 800, Luma([255u8]));
        for y in 200..600 {
            for x in 200..600 {
                img.put_pixel(x, y, Luma([40u8]));
            }
        }
        img
    }

    struct FakeOpener {
        pages: Vec<GrayImage>,
    }

    struct FakeDocument {
        pages: Vec<GrayImage>,
    }

    impl DocumentOpener for FakeOpener {
        type Document = FakeDocument;

        fn open(&self, _path: &Path) -> rasterize::Result<Self::Document> {
            Ok(FakeDocument {
                pages: self.pages.clone(),
            })
        }
    }

    impl PageDocument for FakeDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn rasterize(&self, index: usize, dpi: f64) -> rasterize::Result<PageRaster> {
            let gray = self.pages[index].clone();
            let page_width = f64::from(gray.width()) * 72.0 / dpi;
            let page_height = f64::from(gray.height()) * 72.0 / dpi;
            Ok(PageRaster {
                gray,
                page_width,
                page_height,
                dpi,
            })
        }

        fn text_runs(&self, _index: usize, _dpi: f64) -> rasterize::Result<Vec<TextRun>> {
            Ok(Vec::new())
        }
    }

    struct BrokenOpener;

    struct BrokenDocument;

    impl DocumentOpener for BrokenOpener {
        type Document = BrokenDocument;

        fn open(&self, _path: &Path) -> rasterize::Result<Self::Document> {
            Ok(BrokenDocument)
        }
    }

    impl PageDocument for BrokenDocument {
        fn page_count(&self) -> usize {
            2
        }

        fn rasterize(&self, index: usize, _dpi: f64) -> rasterize::Result<PageRaster> {
            Err(RasterizeError::Render {
                index,
                reason: "simulated render failure".to_string(),
            })
        }

        fn text_runs(&self, _index: usize, _dpi: f64) -> rasterize::Result<Vec<TextRun>> {
            Ok(Vec::new())
        }
    }

    async fn wait_terminal<O: DocumentOpener>(
        orchestrator: &Orchestrator<O>,
        id: JobId,
    ) -> JobSnapshot {
        for _ in 0..500 {
            let snapshot = orchestrator.poll(id).unwrap();
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job never reached a terminal state");
    }

    #[tokio::test]
    async fn rejects_non_pdf_uploads() {
        let orchestrator = Orchestrator::new(
            FakeOpener { pages: vec![] },
            AnalysisConfig::default(),
        );
        let err = orchestrator.submit(b"not a document").await.unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));
        // Nothing was enqueued.
        assert!(orchestrator.registry().is_empty());
    }

    #[tokio::test]
    async fn three_page_job_completes_with_sheets() {
        let orchestrator = Orchestrator::new(
            FakeOpener {
                pages: vec![dark_block_page(), dark_block_page(), dark_block_page()],
            },
            AnalysisConfig::default(),
        );
        let id = orchestrator.submit(b"%PDF-1.4\nfake body").await.unwrap();
        let snapshot = wait_terminal(&orchestrator, id).await;

        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress.current_sheet, 3);
        assert_eq!(snapshot.progress.total_sheets, 3);
        assert!(snapshot.error.is_none());

        let report = snapshot.report.unwrap();
        assert_eq!(report.sheets.len(), 3);
        for sheet in &report.sheets {
            assert_eq!(sheet.polygons.len(), 1);
            assert_eq!(sheet.polygons[0].category, SurfaceCategory::Asphalt);
            // No text runs and no legend bar on the synthetic page.
            assert_eq!(sheet.calibration.provenance, ScaleProvenance::Fallback);
            assert!((sheet.calibration.pixels_per_foot - 15.0).abs() < 1e-9);
        }
        let summary = &report.summary;
        assert_eq!(summary.total_polygons, 3);
        assert!((summary.percent_impervious + summary.percent_pervious - 100.0).abs() < 0.02);
    }

    #[tokio::test]
    async fn render_failure_fails_the_job() {
        let orchestrator = Orchestrator::new(BrokenOpener, AnalysisConfig::default());
        let id = orchestrator.submit(b"%PDF-1.7\n").await.unwrap();
        let snapshot = wait_terminal(&orchestrator, id).await;

        assert_eq!(snapshot.status, JobStatus::Error);
        assert!(snapshot.report.is_none());
        assert!(snapshot
            .error
            .unwrap()
            .contains("simulated render failure"));
    }

    #[tokio::test]
    async fn polling_unknown_job_is_not_found() {
        let orchestrator = Orchestrator::new(
            FakeOpener { pages: vec![] },
            AnalysisConfig::default(),
        );
        let err = orchestrator.poll(JobId::new()).unwrap_err();
        assert!(matches!(err, JobError::NotFound(_)));
    }

    #[tokio::test]
    async fn polygon_vertices_are_in_page_units() {
        let orchestrator = Orchestrator::new(
            FakeOpener {
                pages: vec![dark_block_page()],
            },
            AnalysisConfig::default(),
        );
        let id = orchestrator.submit(b"%PDF-1.4\n").await.unwrap();
        let report = wait_terminal(&orchestrator, id).await.report.unwrap();

        let sheet = &report.sheets[0];
        // 800 px at 300 dpi = 192 page units.
        assert!((sheet.page_dimensions[0] - 192.0).abs() < 1e-9);
        for &[x, y] in &sheet.polygons[0].vertices {
            assert!(x >= 0.0 && x <= sheet.page_dimensions[0]);
            assert!(y >= 0.0 && y <= sheet.page_dimensions[1]);
        }
    }
}
