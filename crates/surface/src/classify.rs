//! Heuristic surface classification from interior texture statistics.
//!
//! The category decision is a data-driven, ordered rule table rather than
//! branching control flow, so thresholds can be tuned (or loaded from
//! config) without touching the matching logic. Accuracy is heuristic by
//! design; the confidence margin tells downstream consumers how close a
//! polygon sat to a decision boundary.

use image::GrayImage;
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::types::{Region, SurfaceCategory};

/// Texture statistics sampled over a polygon's masked interior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDescriptor {
    /// Fraction of interior pixels that are Canny edge pixels, in [0,1].
    pub edge_density: f64,
    /// Mean grayscale intensity of the interior, 0 (black) to 255 (white).
    pub mean_intensity: f64,
    /// Standard deviation of interior intensity.
    pub intensity_stddev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    EdgeDensity,
    MeanIntensity,
    IntensityStdDev,
}

/// An acceptance band for one feature. `norm` is the feature span used to
/// normalize boundary distances into [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lo: Option<f64>,
    pub hi: Option<f64>,
    pub norm: f64,
}

impl Band {
    pub fn above(lo: f64, norm: f64) -> Self {
        Self { lo: Some(lo), hi: None, norm }
    }

    pub fn below(hi: f64, norm: f64) -> Self {
        Self { lo: None, hi: Some(hi), norm }
    }

    pub fn between(lo: f64, hi: f64, norm: f64) -> Self {
        Self { lo: Some(lo), hi: Some(hi), norm }
    }

    fn contains(&self, x: f64) -> bool {
        self.lo.is_none_or(|lo| x > lo) && self.hi.is_none_or(|hi| x < hi)
    }

    /// Distance to the nearest band boundary, normalized. Only meaningful
    /// when `contains(x)`.
    fn margin(&self, x: f64) -> f64 {
        let to_lo = self.lo.map_or(f64::INFINITY, |lo| x - lo);
        let to_hi = self.hi.map_or(f64::INFINITY, |hi| hi - x);
        let nearest = to_lo.min(to_hi);
        if nearest.is_infinite() {
            1.0
        } else {
            nearest / self.norm
        }
    }

    /// Normalized distance by which `x` misses the band. Zero when inside.
    fn deficit(&self, x: f64) -> f64 {
        if let Some(lo) = self.lo {
            if x <= lo {
                return (lo - x) / self.norm;
            }
        }
        if let Some(hi) = self.hi {
            if x >= hi {
                return (x - hi) / self.norm;
            }
        }
        0.0
    }
}

/// One row of the decision table: a category plus the feature bands that
/// must all hold for it to fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRule {
    pub category: SurfaceCategory,
    pub bands: Vec<(Feature, Band)>,
}

impl ClassRule {
    fn feature(descriptor: &SurfaceDescriptor, feature: Feature) -> f64 {
        match feature {
            Feature::EdgeDensity => descriptor.edge_density,
            Feature::MeanIntensity => descriptor.mean_intensity,
            Feature::IntensityStdDev => descriptor.intensity_stddev,
        }
    }

    fn matches(&self, descriptor: &SurfaceDescriptor) -> bool {
        self.bands
            .iter()
            .all(|&(feature, band)| band.contains(Self::feature(descriptor, feature)))
    }

    /// Distance to the nearest boundary of this rule's acceptance region.
    fn margin(&self, descriptor: &SurfaceDescriptor) -> f64 {
        self.bands
            .iter()
            .map(|&(feature, band)| band.margin(Self::feature(descriptor, feature)))
            .fold(f64::INFINITY, f64::min)
    }

    /// L-inf distance from the descriptor to this rule's acceptance region.
    fn deficit(&self, descriptor: &SurfaceDescriptor) -> f64 {
        self.bands
            .iter()
            .map(|&(feature, band)| band.deficit(Self::feature(descriptor, feature)))
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub category: SurfaceCategory,
    pub confidence: f64,
}

/// Ordered decision table; the first matching rule wins, and the fallthrough
/// category applies when nothing matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub rules: Vec<ClassRule>,
    pub fallthrough: SurfaceCategory,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            rules: vec![
                // Diagonal hatching: many edges at medium darkness.
                ClassRule {
                    category: SurfaceCategory::Building,
                    bands: vec![
                        (Feature::EdgeDensity, Band::above(0.15, 0.15)),
                        (Feature::MeanIntensity, Band::between(80.0, 180.0, 50.0)),
                    ],
                },
                // Dense speckle: moderate intensity, high variance.
                ClassRule {
                    category: SurfaceCategory::Concrete,
                    bands: vec![
                        (Feature::MeanIntensity, Band::between(100.0, 200.0, 50.0)),
                        (Feature::IntensityStdDev, Band::above(30.0, 30.0)),
                    ],
                },
                // Uniform dark fill.
                ClassRule {
                    category: SurfaceCategory::Asphalt,
                    bands: vec![
                        (Feature::MeanIntensity, Band::below(100.0, 50.0)),
                        (Feature::IntensityStdDev, Band::below(25.0, 25.0)),
                    ],
                },
            ],
            fallthrough: SurfaceCategory::Pervious,
        }
    }
}

impl RuleTable {
    /// Classify a descriptor. Confidence is the normalized distance from the
    /// nearest decision boundary: a match sitting just inside its bands, or
    /// a fallthrough sitting just outside some rule, both score low.
    pub fn classify(&self, descriptor: &SurfaceDescriptor) -> Classification {
        for rule in &self.rules {
            if rule.matches(descriptor) {
                return Classification {
                    category: rule.category,
                    confidence: rule.margin(descriptor).clamp(0.0, 1.0),
                };
            }
        }

        let nearest_miss = self
            .rules
            .iter()
            .map(|rule| rule.deficit(descriptor))
            .fold(1.0, f64::min);

        Classification {
            category: self.fallthrough,
            confidence: nearest_miss.clamp(0.0, 1.0),
        }
    }
}

/// Classifier over page rasters: samples a polygon's interior and applies
/// the rule table.
#[derive(Debug, Clone)]
pub struct SurfaceClassifier {
    pub rules: RuleTable,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for SurfaceClassifier {
    fn default() -> Self {
        Self {
            rules: RuleTable::default(),
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

impl SurfaceClassifier {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules, ..Self::default() }
    }

    pub fn classify_region(&self, gray: &GrayImage, region: &Region) -> Classification {
        match self.sample(gray, region) {
            Some(descriptor) => self.rules.classify(&descriptor),
            // Nothing sampled (degenerate mask): fall through with no
            // observed support.
            None => Classification {
                category: self.rules.fallthrough,
                confidence: 0.0,
            },
        }
    }

    /// Sample interior texture statistics for a region, masked to the
    /// polygon. Returns `None` when the mask covers no pixels.
    pub fn sample(&self, gray: &GrayImage, region: &Region) -> Option<SurfaceDescriptor> {
        let (min, max) = region.bounding_box();
        let x0 = min[0].floor().max(0.0) as u32;
        let y0 = min[1].floor().max(0.0) as u32;
        let x1 = (max[0].ceil() as u32).min(gray.width().saturating_sub(1));
        let y1 = (max[1].ceil() as u32).min(gray.height().saturating_sub(1));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);

        // Fill the polygon into a bbox-local mask.
        let mut mask = GrayImage::new(w, h);
        let mut points: Vec<Point<i32>> = region
            .vertices
            .iter()
            .map(|&[x, y]| Point::new((x - f64::from(x0)) as i32, (y - f64::from(y0)) as i32))
            .collect();
        points.dedup();
        if points.len() >= 2 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return None;
        }
        draw_polygon_mut(&mut mask, &points, image::Luma([255u8]));

        let roi = image::imageops::crop_imm(gray, x0, y0, w, h).to_image();
        let edges = imageproc::edges::canny(&roi, self.canny_low, self.canny_high);

        let mut count = 0u64;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut edge_count = 0u64;
        for (x, y, m) in mask.enumerate_pixels() {
            if m.0[0] == 0 {
                continue;
            }
            let v = f64::from(roi.get_pixel(x, y).0[0]);
            count += 1;
            sum += v;
            sum_sq += v * v;
            if edges.get_pixel(x, y).0[0] > 0 {
                edge_count += 1;
            }
        }
        if count == 0 {
            return None;
        }

        let n = count as f64;
        let mean = sum / n;
        let variance = (sum_sq / n - mean * mean).max(0.0);

        Some(SurfaceDescriptor {
            edge_density: edge_count as f64 / n,
            mean_intensity: mean,
            intensity_stddev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn descriptor(edge: f64, mean: f64, stddev: f64) -> SurfaceDescriptor {
        SurfaceDescriptor {
            edge_density: edge,
            mean_intensity: mean,
            intensity_stddev: stddev,
        }
    }

    #[test]
    fn hatched_medium_darkness_is_building() {
        let table = RuleTable::default();
        let result = table.classify(&descriptor(0.4, 130.0, 45.0));
        assert_eq!(result.category, SurfaceCategory::Building);
        assert!(result.confidence > 0.5);
    }

    #[test]
    fn speckled_moderate_intensity_is_concrete() {
        let table = RuleTable::default();
        let result = table.classify(&descriptor(0.05, 160.0, 45.0));
        assert_eq!(result.category, SurfaceCategory::Concrete);
    }

    #[test]
    fn uniform_dark_is_asphalt() {
        let table = RuleTable::default();
        let result = table.classify(&descriptor(0.0, 60.0, 5.0));
        assert_eq!(result.category, SurfaceCategory::Asphalt);
    }

    #[test]
    fn light_featureless_falls_through_to_pervious() {
        let table = RuleTable::default();
        let result = table.classify(&descriptor(0.0, 235.0, 4.0));
        assert_eq!(result.category, SurfaceCategory::Pervious);
        assert!(result.confidence > 0.3);
    }

    #[test]
    fn boundary_proximity_lowers_confidence() {
        let table = RuleTable::default();
        // Just above the edge-density threshold for Building.
        let near = table.classify(&descriptor(0.16, 130.0, 40.0));
        let far = table.classify(&descriptor(0.45, 130.0, 40.0));
        assert_eq!(near.category, SurfaceCategory::Building);
        assert!(near.confidence < 0.1);
        assert!(far.confidence > near.confidence);
    }

    #[test]
    fn classification_is_deterministic() {
        let table = RuleTable::default();
        let d = descriptor(0.2, 140.0, 33.0);
        assert_eq!(table.classify(&d), table.classify(&d));
    }

    #[test]
    fn samples_uniform_dark_region_as_asphalt() {
        let mut img = GrayImage::from_pixel(100, 100, Luma([255u8]));
        for y in 10..90 {
            for x in 10..90 {
                img.put_pixel(x, y, Luma([60u8]));
            }
        }
        let region = Region::new(vec![
            [12.0, 12.0], [88.0, 12.0], [88.0, 88.0], [12.0, 88.0],
        ]);

        let classifier = SurfaceClassifier::default();
        let d = classifier.sample(&img, &region).unwrap();
        assert!((d.mean_intensity - 60.0).abs() < 2.0);
        assert!(d.intensity_stddev < 5.0);

        let result = classifier.classify_region(&img, &region);
        assert_eq!(result.category, SurfaceCategory::Asphalt);
    }

    #[test]
    fn samples_hatched_region_as_building() {
        let mut img = GrayImage::from_pixel(100, 100, Luma([255u8]));
        for y in 5..95 {
            for x in 5..95 {
                let v = if x % 3 == 0 { 60u8 } else { 150u8 };
                img.put_pixel(x, y, Luma([v]));
            }
        }
        let region = Region::new(vec![
            [8.0, 8.0], [92.0, 8.0], [92.0, 92.0], [8.0, 92.0],
        ]);

        let classifier = SurfaceClassifier::default();
        let d = classifier.sample(&img, &region).unwrap();
        assert!(d.edge_density > 0.15, "edge density was {}", d.edge_density);

        let result = classifier.classify_region(&img, &region);
        assert_eq!(result.category, SurfaceCategory::Building);
    }

    #[test]
    fn empty_mask_falls_through_with_zero_confidence() {
        let img = GrayImage::from_pixel(10, 10, Luma([255u8]));
        let degenerate = Region::new(vec![[2.0, 2.0], [2.0, 2.0], [2.0, 2.0]]);
        let result = SurfaceClassifier::default().classify_region(&img, &degenerate);
        assert_eq!(result.category, SurfaceCategory::Pervious);
        assert_eq!(result.confidence, 0.0);
    }
}
