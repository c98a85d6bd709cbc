use std::collections::BTreeMap;

use geo::{Area, Contains};
use geo_types::{Coord, LineString, Polygon};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

/// Surface category assigned by the classifier.
///
/// `Water` is carried for completeness (some plan sets hatch ponds and
/// detention basins) but the default rule table never emits it; it counts
/// as pervious for coverage totals.
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SurfaceCategory {
    Building,
    Concrete,
    Asphalt,
    Pervious,
    Water,
}

impl SurfaceCategory {
    /// Whether this category counts toward impervious coverage.
    pub fn is_impervious(self) -> bool {
        matches!(self, Self::Building | Self::Concrete | Self::Asphalt)
    }
}

/// Which detection strategy produced a sheet's scale value.
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ScaleProvenance {
    TextRecognized,
    Graphical,
    Fallback,
}

/// Pixel-to-real-world conversion for one sheet.
///
/// Serializes as `{ "value": <pixels per foot>, "provenance": <tag> }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ScaleCalibration {
    /// Pixels per foot at the sheet's rasterization resolution.
    #[serde(rename = "value")]
    pub pixels_per_foot: f64,
    pub provenance: ScaleProvenance,
}

impl ScaleCalibration {
    /// Convert a pixel area to square feet.
    pub fn pixel_area_to_sqft(&self, pixel_area: f64) -> f64 {
        pixel_area / (self.pixels_per_foot * self.pixels_per_foot)
    }
}

/// A closed region traced from a raster, before classification.
///
/// Vertices are in raster pixel space, ordered along the boundary, without
/// a closing duplicate of the first point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub vertices: Vec<[f64; 2]>,
}

impl Region {
    pub fn new(vertices: Vec<[f64; 2]>) -> Self {
        Self { vertices }
    }

    /// Convert to a geo-types polygon for geometric operations.
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self
            .vertices
            .iter()
            .map(|&[x, y]| Coord { x, y })
            .collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    /// Unsigned area in square pixels (shoelace, orientation independent).
    pub fn pixel_area(&self) -> f64 {
        self.to_geo_polygon().unsigned_area()
    }

    /// Boundary length in pixels, including the closing edge.
    pub fn perimeter(&self) -> f64 {
        let n = self.vertices.len();
        if n < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        for i in 0..n {
            let [x0, y0] = self.vertices[i];
            let [x1, y1] = self.vertices[(i + 1) % n];
            total += ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        }
        total
    }

    /// Shape regularity: 4π·area / perimeter². 1.0 for a circle, lower for
    /// ragged or elongated boundaries.
    pub fn compactness(&self) -> f64 {
        let perimeter = self.perimeter();
        if perimeter == 0.0 {
            return 0.0;
        }
        4.0 * std::f64::consts::PI * self.pixel_area() / (perimeter * perimeter)
    }

    /// Axis-aligned bounding box as ([min_x, min_y], [max_x, max_y]).
    pub fn bounding_box(&self) -> ([f64; 2], [f64; 2]) {
        let mut min = [f64::INFINITY, f64::INFINITY];
        let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        for &[x, y] in &self.vertices {
            min[0] = min[0].min(x);
            min[1] = min[1].min(y);
            max[0] = max[0].max(x);
            max[1] = max[1].max(y);
        }
        (min, max)
    }

    /// Whether this region fully contains another.
    pub fn contains(&self, other: &Region) -> bool {
        self.to_geo_polygon().contains(&other.to_geo_polygon())
    }
}

/// A classified, measured surface polygon.
///
/// Vertices are in the sheet's native page coordinate space. Invariants:
/// `review_needed` is true exactly when `review_reasons` is non-empty, and
/// `area_sqft` is strictly positive.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SurfacePolygon {
    pub id: String,
    pub vertices: Vec<[f64; 2]>,
    pub category: SurfaceCategory,
    pub confidence: f64,
    pub pixel_area: f64,
    pub area_sqft: f64,
    pub compactness: f64,
    pub vertex_count: usize,
    pub review_needed: bool,
    pub review_reasons: Vec<String>,
}

/// Per-sheet area totals in square feet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SheetTotals {
    pub impervious: f64,
    pub pervious: f64,
    pub by_category: BTreeMap<SurfaceCategory, f64>,
}

/// One fully processed plan-set page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Sheet {
    /// 1-indexed page number.
    pub sheet_number: usize,
    /// Raster width/height in pixels at the processing resolution.
    pub raster_dimensions: [u32; 2],
    /// Native page width/height in page units.
    pub page_dimensions: [f64; 2],
    #[serde(rename = "scale")]
    pub calibration: ScaleCalibration,
    pub polygons: Vec<SurfacePolygon>,
    pub sheet_totals: SheetTotals,
}

/// Round to two decimals at the reporting boundary.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f64) -> Region {
        Region::new(vec![[0.0, 0.0], [side, 0.0], [side, side], [0.0, side]])
    }

    /// Independent shoelace reference, summing cross products directly.
    fn shoelace_reference(vertices: &[[f64; 2]]) -> f64 {
        let n = vertices.len();
        let mut twice_area = 0.0;
        for i in 0..n {
            let [x0, y0] = vertices[i];
            let [x1, y1] = vertices[(i + 1) % n];
            twice_area += x0 * y1 - x1 * y0;
        }
        (twice_area / 2.0).abs()
    }

    #[test]
    fn pixel_area_matches_shoelace_reference() {
        let region = Region::new(vec![[1.0, 1.0], [7.0, 2.0], [9.0, 8.0], [3.0, 10.0], [0.0, 5.0]]);
        let expected = shoelace_reference(&region.vertices);
        assert!((region.pixel_area() - expected).abs() < 1e-9);
    }

    #[test]
    fn pixel_area_is_orientation_independent() {
        let ccw = square(10.0);
        let mut reversed = ccw.vertices.clone();
        reversed.reverse();
        let cw = Region::new(reversed);
        assert!((ccw.pixel_area() - 100.0).abs() < 1e-9);
        assert!((ccw.pixel_area() - cw.pixel_area()).abs() < 1e-9);
    }

    #[test]
    fn unit_square_area_at_two_pixels_per_foot() {
        let calibration = ScaleCalibration {
            pixels_per_foot: 2.0,
            provenance: ScaleProvenance::TextRecognized,
        };
        let region = square(10.0);
        assert!((calibration.pixel_area_to_sqft(region.pixel_area()) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn square_compactness() {
        // 4π·s² / (4s)² = π/4 ≈ 0.785
        let region = square(20.0);
        assert!((region.compactness() - std::f64::consts::FRAC_PI_4).abs() < 1e-9);
    }

    #[test]
    fn containment() {
        let outer = square(100.0);
        let inner = Region::new(vec![[10.0, 10.0], [20.0, 10.0], [20.0, 20.0], [10.0, 20.0]]);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn category_coverage_split() {
        assert!(SurfaceCategory::Building.is_impervious());
        assert!(SurfaceCategory::Concrete.is_impervious());
        assert!(SurfaceCategory::Asphalt.is_impervious());
        assert!(!SurfaceCategory::Pervious.is_impervious());
        assert!(!SurfaceCategory::Water.is_impervious());
    }

    #[test]
    fn provenance_serializes_kebab_case() {
        let json = serde_json::to_string(&ScaleProvenance::TextRecognized).unwrap();
        assert_eq!(json, "\"text-recognized\"");
    }
}
