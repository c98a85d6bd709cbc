//! GeoJSON export/import for classified surface polygons.
//!
//! Coordinates are page-space, not georeferenced; the format is used as an
//! interchange container for GIS tools. Export is round-trip capable:
//! re-importing preserves vertex count, ordering, and category for every
//! polygon.

use std::str::FromStr;

use geojson::{Feature, FeatureCollection, Geometry, Value};

use crate::{
    error::{Result, SurfaceError},
    types::{Sheet, SurfaceCategory},
};

/// A polygon as it appears in a GeoJSON interchange file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedPolygon {
    pub id: String,
    pub sheet: usize,
    pub category: SurfaceCategory,
    pub area_sqft: f64,
    pub vertices: Vec<[f64; 2]>,
}

fn json_f64(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Export all polygons of a completed job to a feature collection.
pub fn sheets_to_geojson(sheets: &[Sheet]) -> FeatureCollection {
    let mut features = Vec::new();

    for sheet in sheets {
        for polygon in &sheet.polygons {
            // GeoJSON rings are closed; the closing vertex is stripped again
            // on import.
            let mut ring: Vec<Vec<f64>> = polygon
                .vertices
                .iter()
                .map(|&[x, y]| vec![x, y])
                .collect();
            if let Some(first) = ring.first().cloned() {
                ring.push(first);
            }
            let geometry = Geometry::new(Value::Polygon(vec![ring]));

            let coverage = if polygon.category.is_impervious() {
                "impervious"
            } else {
                "pervious"
            };

            let mut properties = serde_json::Map::new();
            properties.insert("id".to_string(), serde_json::Value::String(polygon.id.clone()));
            properties.insert(
                "sheet".to_string(),
                serde_json::Value::Number(serde_json::Number::from(sheet.sheet_number)),
            );
            properties.insert(
                "category".to_string(),
                serde_json::Value::String(polygon.category.to_string()),
            );
            properties.insert("area_sqft".to_string(), json_f64(polygon.area_sqft));
            properties.insert("confidence".to_string(), json_f64(polygon.confidence));
            properties.insert(
                "coverage".to_string(),
                serde_json::Value::String(coverage.to_string()),
            );
            properties.insert(
                "review_needed".to_string(),
                serde_json::Value::Bool(polygon.review_needed),
            );

            features.push(Feature {
                bbox: None,
                geometry: Some(geometry),
                id: Some(geojson::feature::Id::String(polygon.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            });
        }
    }

    let mut foreign_members = serde_json::Map::new();
    foreign_members.insert(
        "sheet_count".to_string(),
        serde_json::Value::Number(serde_json::Number::from(sheets.len())),
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    }
}

pub fn sheets_to_geojson_string(sheets: &[Sheet]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&sheets_to_geojson(sheets))?)
}

/// Re-import polygons from a GeoJSON string produced by
/// [`sheets_to_geojson`].
pub fn polygons_from_geojson_string(geojson_str: &str) -> Result<Vec<ExportedPolygon>> {
    let collection: FeatureCollection = geojson_str.parse()?;
    let mut polygons = Vec::new();

    for feature in collection.features {
        let Some(geometry) = feature.geometry else { continue };
        let Value::Polygon(rings) = geometry.value else { continue };
        let Some(ring) = rings.first() else { continue };

        let mut vertices: Vec<[f64; 2]> = ring.iter().map(|c| [c[0], c[1]]).collect();
        if vertices.len() >= 2 && vertices.first() == vertices.last() {
            vertices.pop();
        }

        let properties = feature.properties.ok_or_else(|| {
            SurfaceError::GeometricComputation("feature without properties".to_string())
        })?;
        let id = properties
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SurfaceError::GeometricComputation("missing polygon id".to_string()))?
            .to_string();
        let sheet = properties
            .get("sheet")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| SurfaceError::GeometricComputation("missing sheet number".to_string()))?
            as usize;
        let category = properties
            .get("category")
            .and_then(|v| v.as_str())
            .and_then(|s| SurfaceCategory::from_str(s).ok())
            .ok_or_else(|| {
                SurfaceError::GeometricComputation("missing or invalid category".to_string())
            })?;
        let area_sqft = properties
            .get("area_sqft")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        polygons.push(ExportedPolygon {
            id,
            sheet,
            category,
            area_sqft,
            vertices,
        });
    }

    Ok(polygons)
}
