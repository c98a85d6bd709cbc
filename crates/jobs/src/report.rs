//! Final job output: per-sheet detail, a flat polygon list for tabular
//! consumers, and the job-wide summary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use surface::area::{summarize, Summary};
use surface::types::{Sheet, SurfacePolygon};

/// One polygon with its sheet number attached, for consumers that do not
/// want to walk the per-sheet structure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FlatPolygon {
    pub sheet: usize,
    #[serde(flatten)]
    pub polygon: SurfacePolygon,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AnalysisReport {
    pub sheets: Vec<Sheet>,
    pub polygons: Vec<FlatPolygon>,
    pub summary: Summary,
}

impl AnalysisReport {
    /// Build the report from finalized sheets; the flat list and summary
    /// are projections of the sheet data.
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        let summary = summarize(&sheets);
        let polygons = sheets
            .iter()
            .flat_map(|sheet| {
                sheet.polygons.iter().map(|polygon| FlatPolygon {
                    sheet: sheet.sheet_number,
                    polygon: polygon.clone(),
                })
            })
            .collect();
        Self {
            sheets,
            polygons,
            summary,
        }
    }
}
