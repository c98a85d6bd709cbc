use geo::Simplify;
use geo_types::{Coord, LineString};

use crate::{
    error::Result,
    traits::{Frame, RegionFilter},
    types::Region,
};

/// Douglas-Peucker vertex reduction using geo's implementation.
///
/// Regions degenerating below 3 vertices after simplification are dropped.
#[derive(Debug, Clone)]
pub struct SimplifyFilter {
    pub epsilon: f64,
}

impl Default for SimplifyFilter {
    fn default() -> Self {
        Self { epsilon: 2.0 }
    }
}

impl RegionFilter for SimplifyFilter {
    fn apply(&self, regions: Vec<Region>, _frame: &Frame) -> Result<Vec<Region>> {
        let simplified = regions
            .into_iter()
            .map(|region| {
                let coords: Vec<Coord<f64>> = region
                    .vertices
                    .iter()
                    .map(|&[x, y]| Coord { x, y })
                    .collect();
                let line = LineString::new(coords).simplify(&self.epsilon);
                Region::new(line.coords().map(|c| [c.x, c.y]).collect())
            })
            .filter(|region| region.vertices.len() >= 3)
            .collect();
        Ok(simplified)
    }
}

/// Pixel-area band filter: drops regions below the noise floor and regions
/// claiming an implausible share of the sheet (title blocks, border frames).
#[derive(Debug, Clone)]
pub struct AreaBandFilter {
    pub min_area_px: f64,
    pub max_area_ratio: f64,
}

impl Default for AreaBandFilter {
    fn default() -> Self {
        Self {
            min_area_px: 10_000.0,
            max_area_ratio: 0.35,
        }
    }
}

impl RegionFilter for AreaBandFilter {
    fn apply(&self, regions: Vec<Region>, frame: &Frame) -> Result<Vec<Region>> {
        let max_area = frame.pixel_area() * self.max_area_ratio;
        Ok(regions
            .into_iter()
            .filter(|region| {
                let area = region.pixel_area();
                area >= self.min_area_px && area <= max_area
            })
            .collect())
    }
}

/// Drops regions spanning nearly the full sheet width or height — those are
/// drawing borders, not surfaces.
#[derive(Debug, Clone)]
pub struct BorderSpanFilter {
    pub max_span_ratio: f64,
}

impl Default for BorderSpanFilter {
    fn default() -> Self {
        Self { max_span_ratio: 0.85 }
    }
}

impl RegionFilter for BorderSpanFilter {
    fn apply(&self, regions: Vec<Region>, frame: &Frame) -> Result<Vec<Region>> {
        let max_w = f64::from(frame.width) * self.max_span_ratio;
        let max_h = f64::from(frame.height) * self.max_span_ratio;
        Ok(regions
            .into_iter()
            .filter(|region| {
                let (min, max) = region.bounding_box();
                (max[0] - min[0]) <= max_w && (max[1] - min[1]) <= max_h
            })
            .collect())
    }
}

/// Drops very elongated regions — stray linework rather than surfaces.
#[derive(Debug, Clone)]
pub struct AspectRatioFilter {
    pub max_aspect: f64,
}

impl Default for AspectRatioFilter {
    fn default() -> Self {
        Self { max_aspect: 15.0 }
    }
}

impl RegionFilter for AspectRatioFilter {
    fn apply(&self, regions: Vec<Region>, _frame: &Frame) -> Result<Vec<Region>> {
        Ok(regions
            .into_iter()
            .filter(|region| {
                let (min, max) = region.bounding_box();
                let w = max[0] - min[0];
                let h = max[1] - min[1];
                let aspect = w.max(h) / (w.min(h) + 1.0);
                aspect <= self.max_aspect
            })
            .collect())
    }
}

/// Deduplicates nested contours: when a region is fully enclosed in another
/// and covers most of its area, the two trace the same boundary and only the
/// outer one is kept.
#[derive(Debug, Clone)]
pub struct NestedDuplicateFilter {
    /// Inner/outer area ratio above which the inner region is a duplicate.
    pub min_overlap_ratio: f64,
}

impl Default for NestedDuplicateFilter {
    fn default() -> Self {
        Self { min_overlap_ratio: 0.9 }
    }
}

impl RegionFilter for NestedDuplicateFilter {
    fn apply(&self, regions: Vec<Region>, _frame: &Frame) -> Result<Vec<Region>> {
        let mut indexed: Vec<(Region, f64)> = regions
            .into_iter()
            .map(|region| {
                let area = region.pixel_area();
                (region, area)
            })
            .collect();

        // Largest first, so outer boundaries claim their duplicates.
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut kept: Vec<(Region, f64)> = Vec::with_capacity(indexed.len());
        for (candidate, area) in indexed {
            let duplicate = kept.iter().any(|(outer, outer_area)| {
                *outer_area > 0.0
                    && area / outer_area >= self.min_overlap_ratio
                    && outer.contains(&candidate)
            });
            if !duplicate {
                kept.push((candidate, area));
            }
        }

        Ok(kept.into_iter().map(|(region, _)| region).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame { width: 1000, height: 1000 }
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Region {
        Region::new(vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]])
    }

    #[test]
    fn area_band_drops_noise_and_frames() {
        let filter = AreaBandFilter { min_area_px: 100.0, max_area_ratio: 0.35 };
        let regions = vec![
            rect(0.0, 0.0, 5.0, 5.0),       // 25 px, noise
            rect(0.0, 0.0, 50.0, 50.0),     // 2500 px, keep
            rect(0.0, 0.0, 700.0, 700.0),   // 49% of frame, too large
        ];
        let kept = filter.apply(regions, &frame()).unwrap();
        assert_eq!(kept.len(), 1);
        assert!((kept[0].pixel_area() - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn border_span_filter_drops_page_frame() {
        let filter = BorderSpanFilter::default();
        let regions = vec![rect(10.0, 10.0, 990.0, 200.0), rect(0.0, 0.0, 300.0, 300.0)];
        let kept = filter.apply(regions, &frame()).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0], rect(0.0, 0.0, 300.0, 300.0));
    }

    #[test]
    fn aspect_filter_drops_linework() {
        let filter = AspectRatioFilter::default();
        let regions = vec![rect(0.0, 0.0, 800.0, 10.0), rect(0.0, 0.0, 100.0, 80.0)];
        let kept = filter.apply(regions, &frame()).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn nested_duplicate_keeps_outer() {
        let filter = NestedDuplicateFilter::default();
        let outer = rect(0.0, 0.0, 100.0, 100.0);
        let duplicate = rect(1.0, 1.0, 99.0, 99.0);
        let kept = filter
            .apply(vec![duplicate, outer.clone()], &frame())
            .unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0], outer);
    }

    #[test]
    fn genuinely_nested_smaller_region_survives() {
        let filter = NestedDuplicateFilter::default();
        let lot = rect(0.0, 0.0, 100.0, 100.0);
        let pad = rect(40.0, 40.0, 60.0, 60.0); // 4% of the lot
        let kept = filter.apply(vec![lot, pad], &frame()).unwrap();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn simplify_collapses_collinear_vertices() {
        let filter = SimplifyFilter { epsilon: 0.5 };
        let region = Region::new(vec![
            [0.0, 0.0], [5.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0],
        ]);
        let kept = filter.apply(vec![region], &frame()).unwrap();
        assert_eq!(kept[0].vertices.len(), 4);
    }
}
