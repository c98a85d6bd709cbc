//! Area aggregation: per-sheet totals and the job-wide summary.
//!
//! Everything here is a pure projection of finalized polygon data; nothing
//! mutates polygon identity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{round2, Sheet, SheetTotals, SurfaceCategory, SurfacePolygon};

/// Named impervious subtotals for drainage reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ImperviousSurfaces {
    pub building_footprints: f64,
    pub concrete_paving: f64,
    pub asphalt_paving: f64,
    pub subtotal: f64,
}

/// Named pervious subtotals. Water features are counted as pervious cover.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PerviousSurfaces {
    pub turf_grass: f64,
    pub water: f64,
    pub subtotal: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Categorized {
    pub impervious_surfaces: ImperviousSurfaces,
    pub pervious_surfaces: PerviousSurfaces,
}

/// Job-wide aggregate across all sheets. Recomputed from sheet data, never
/// mutated directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Summary {
    pub total_polygons: usize,
    pub polygons_needing_review: usize,
    pub total_impervious_sqft: f64,
    pub total_pervious_sqft: f64,
    pub total_site_area_sqft: f64,
    pub percent_impervious: f64,
    pub percent_pervious: f64,
    pub categorized: Categorized,
}

fn category_total(polygons: &[&SurfacePolygon], category: SurfaceCategory) -> f64 {
    polygons
        .iter()
        .filter(|p| p.category == category)
        .map(|p| p.area_sqft)
        .sum()
}

/// Compute one sheet's totals from its finalized polygons.
pub fn sheet_totals(polygons: &[SurfacePolygon]) -> SheetTotals {
    let mut totals = SheetTotals::default();
    for polygon in polygons {
        let entry = totals.by_category.entry(polygon.category).or_insert(0.0);
        *entry += polygon.area_sqft;
        if polygon.category.is_impervious() {
            totals.impervious += polygon.area_sqft;
        } else {
            totals.pervious += polygon.area_sqft;
        }
    }
    totals.impervious = round2(totals.impervious);
    totals.pervious = round2(totals.pervious);
    for value in totals.by_category.values_mut() {
        *value = round2(*value);
    }
    totals
}

/// Compute the job summary across all sheets.
///
/// Percentages are rounded to two decimals and sum to 100 within rounding
/// whenever any area was measured.
pub fn summarize(sheets: &[Sheet]) -> Summary {
    let polygons: Vec<&SurfacePolygon> = sheets.iter().flat_map(|s| s.polygons.iter()).collect();

    let building = category_total(&polygons, SurfaceCategory::Building);
    let concrete = category_total(&polygons, SurfaceCategory::Concrete);
    let asphalt = category_total(&polygons, SurfaceCategory::Asphalt);
    let pervious = category_total(&polygons, SurfaceCategory::Pervious);
    let water = category_total(&polygons, SurfaceCategory::Water);

    let total_impervious = building + concrete + asphalt;
    let total_pervious = pervious + water;
    let total_site = total_impervious + total_pervious;

    let (percent_impervious, percent_pervious) = if total_site > 0.0 {
        (
            round2(total_impervious / total_site * 100.0),
            round2(total_pervious / total_site * 100.0),
        )
    } else {
        (0.0, 0.0)
    };

    Summary {
        total_polygons: polygons.len(),
        polygons_needing_review: polygons.iter().filter(|p| p.review_needed).count(),
        total_impervious_sqft: round2(total_impervious),
        total_pervious_sqft: round2(total_pervious),
        total_site_area_sqft: round2(total_site),
        percent_impervious,
        percent_pervious,
        categorized: Categorized {
            impervious_surfaces: ImperviousSurfaces {
                building_footprints: round2(building),
                concrete_paving: round2(concrete),
                asphalt_paving: round2(asphalt),
                subtotal: round2(total_impervious),
            },
            pervious_surfaces: PerviousSurfaces {
                turf_grass: round2(pervious),
                water: round2(water),
                subtotal: round2(total_pervious),
            },
        },
    }
}
