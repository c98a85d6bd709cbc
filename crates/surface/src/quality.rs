//! Deterministic review flagging.
//!
//! Every rule is evaluated independently and all matching reasons are
//! collected; `review_needed` is simply "at least one reason". Thresholds
//! are configuration, not constants, so projects at unusual plan scales can
//! retune them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const REASON_VERY_SMALL: &str = "very small area";
pub const REASON_VERY_LARGE: &str = "very large area";
pub const REASON_IRREGULAR: &str = "irregular shape";
pub const REASON_COMPLEX: &str = "complex polygon";
pub const REASON_OUTLIER: &str = "statistical outlier";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    pub min_area_sqft: f64,
    pub max_area_sqft: f64,
    pub min_compactness: f64,
    pub max_vertex_count: usize,
    /// Outlier checking only runs on sheets with at least this many polygons.
    pub outlier_min_samples: usize,
    pub outlier_sigma: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_area_sqft: 100.0,
            max_area_sqft: 50_000.0,
            min_compactness: 0.15,
            max_vertex_count: 50,
            outlier_min_samples: 10,
            outlier_sigma: 3.0,
        }
    }
}

/// Population area statistics for one sheet, used by the outlier rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetAreaStats {
    pub count: usize,
    pub mean: f64,
    pub stddev: f64,
}

impl SheetAreaStats {
    pub fn from_areas(areas: &[f64]) -> Self {
        let count = areas.len();
        if count == 0 {
            return Self { count: 0, mean: 0.0, stddev: 0.0 };
        }
        let n = count as f64;
        let mean = areas.iter().sum::<f64>() / n;
        let variance = areas.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
        Self { count, mean, stddev: variance.sqrt() }
    }
}

impl QualityConfig {
    /// Collect every review reason that applies to one polygon.
    ///
    /// The outlier rule is skipped, not failed, when the sheet has fewer
    /// than `outlier_min_samples` polygons.
    pub fn review_reasons(
        &self,
        area_sqft: f64,
        compactness: f64,
        vertex_count: usize,
        sheet_stats: &SheetAreaStats,
    ) -> Vec<String> {
        let mut reasons = Vec::new();

        if area_sqft < self.min_area_sqft {
            reasons.push(REASON_VERY_SMALL.to_string());
        }
        if area_sqft > self.max_area_sqft {
            reasons.push(REASON_VERY_LARGE.to_string());
        }
        if compactness < self.min_compactness {
            reasons.push(REASON_IRREGULAR.to_string());
        }
        if vertex_count > self.max_vertex_count {
            reasons.push(REASON_COMPLEX.to_string());
        }
        if sheet_stats.count >= self.outlier_min_samples
            && (area_sqft - sheet_stats.mean).abs() > self.outlier_sigma * sheet_stats.stddev
        {
            reasons.push(REASON_OUTLIER.to_string());
        }

        reasons
    }
}
