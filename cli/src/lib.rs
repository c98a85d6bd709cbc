use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use jobs::{AnalysisConfig, AnalysisReport};

#[derive(Error, Debug)]
pub enum PlanCliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// A full analysis run: the document, where results go, and pipeline
/// tuning. `config` defaults cover everything, so a minimal file is just
/// the two paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    pub input: String,
    pub output_dir: String,
    #[serde(default)]
    pub config: AnalysisConfig,
}

impl AnalysisRequest {
    pub fn new(input: impl Into<String>, output_dir: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            config: AnalysisConfig::default(),
        }
    }

    /// Load a request from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, PlanCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a request from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, PlanCliError> {
        let request: AnalysisRequest = toml::from_str(content)?;
        Ok(request)
    }

    /// Load a request from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PlanCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a request from a JSON string
    pub fn from_json(content: &str) -> Result<Self, PlanCliError> {
        let request: AnalysisRequest = serde_json::from_str(content)?;
        Ok(request)
    }

    /// Auto-detect file format and load
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PlanCliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(PlanCliError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, PlanCliError> {
        let toml = toml::to_string_pretty(&self)?;
        Ok(toml)
    }

    pub fn to_json(&self) -> Result<String, PlanCliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}

/// Render the report as a sectioned CSV: summary, per-category breakdown,
/// then one row per polygon.
pub fn report_to_csv(report: &AnalysisReport) -> String {
    let summary = &report.summary;
    let categorized = &summary.categorized;
    let mut out = String::new();

    out.push_str("Surface Area Calculations\n\n");

    out.push_str("Summary\n");
    out.push_str(&format!("Total Polygons,{}\n", summary.total_polygons));
    out.push_str(&format!(
        "Polygons Needing Review,{}\n",
        summary.polygons_needing_review
    ));
    out.push_str(&format!(
        "Total Impervious (sqft),{}\n",
        summary.total_impervious_sqft
    ));
    out.push_str(&format!(
        "Total Pervious (sqft),{}\n",
        summary.total_pervious_sqft
    ));
    out.push_str(&format!(
        "Percent Impervious,{}\n\n",
        summary.percent_impervious
    ));

    out.push_str("Breakdown by Surface Type\n");
    out.push_str(&format!(
        "Building (sqft),{}\n",
        categorized.impervious_surfaces.building_footprints
    ));
    out.push_str(&format!(
        "Concrete (sqft),{}\n",
        categorized.impervious_surfaces.concrete_paving
    ));
    out.push_str(&format!(
        "Asphalt (sqft),{}\n",
        categorized.impervious_surfaces.asphalt_paving
    ));
    out.push_str(&format!(
        "Turf/Grass (sqft),{}\n",
        categorized.pervious_surfaces.turf_grass
    ));
    out.push_str(&format!(
        "Water (sqft),{}\n\n",
        categorized.pervious_surfaces.water
    ));

    out.push_str("Detailed Polygon Data\n");
    out.push_str(
        "Polygon ID,Sheet,Surface Type,Area (sqft),Coverage,Confidence,Review Reasons\n",
    );
    for flat in &report.polygons {
        let polygon = &flat.polygon;
        let coverage = if polygon.category.is_impervious() {
            "Impervious"
        } else {
            "Pervious"
        };
        out.push_str(&format!(
            "{},{},{},{},{},{:.2},{}\n",
            polygon.id,
            flat.sheet,
            polygon.category,
            polygon.area_sqft,
            coverage,
            polygon.confidence,
            csv_field(&polygon.review_reasons.join("; ")),
        ));
    }

    out
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
