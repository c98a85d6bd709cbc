//! Sheet scale calibration.
//!
//! Two independent strategies run per sheet: numeral labels from the scale
//! legend (spacing between tick-mark labels gives pixels per foot), and a
//! graphical scale bar (longest near-horizontal ink run in the legend band,
//! combined with the nearest recognized numeral pair). When both fail the
//! documented fallback applies: 1" = 20' at the rasterization resolution.
//! Calibration never fails a sheet; it only degrades provenance.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{ScaleCalibration, ScaleProvenance};

/// A positioned text span from the page, in raster pixel coordinates
/// (x/y is the span's center).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleDetector {
    /// Rasterization resolution in dots per inch.
    pub dpi: f64,
    /// Fraction of the sheet height, measured from the bottom, scanned for
    /// scale legends.
    pub band_fraction: f64,
    /// Bar length in feet assumed when a bar is found but no numeral is
    /// readable near it.
    pub assumed_bar_feet: f64,
    /// Fallback plan scale, feet per plotted inch (1" = 20').
    pub fallback_feet_per_inch: f64,
    /// Minimum pixel length for a run to count as a scale bar.
    pub min_bar_px: u32,
    pub ink_threshold: u8,
}

impl Default for ScaleDetector {
    fn default() -> Self {
        Self {
            dpi: 300.0,
            band_fraction: 0.2,
            assumed_bar_feet: 40.0,
            fallback_feet_per_inch: 20.0,
            min_bar_px: 100,
            ink_threshold: 128,
        }
    }
}

/// Pixels-per-foot values outside this range are rejected as misreads.
const PPF_SANE: std::ops::RangeInclusive<f64> = 1.0..=1000.0;

/// Adjacent label spacings may disagree by at most this factor before the
/// sequence is rejected as not being a tick row.
const MAX_SPACING_SPREAD: f64 = 1.25;

impl ScaleDetector {
    pub fn detect(&self, gray: &GrayImage, labels: &[ScaleLabel]) -> ScaleCalibration {
        if let Some(pixels_per_foot) = self.from_labels(gray.height(), labels) {
            debug!(pixels_per_foot, "scale from legend labels");
            return ScaleCalibration {
                pixels_per_foot,
                provenance: ScaleProvenance::TextRecognized,
            };
        }

        if let Some(pixels_per_foot) = self.from_bar(gray, labels) {
            debug!(pixels_per_foot, "scale from graphical bar");
            return ScaleCalibration {
                pixels_per_foot,
                provenance: ScaleProvenance::Graphical,
            };
        }

        let pixels_per_foot = self.dpi / self.fallback_feet_per_inch;
        debug!(pixels_per_foot, "scale fallback");
        ScaleCalibration {
            pixels_per_foot,
            provenance: ScaleProvenance::Fallback,
        }
    }

    fn band_top(&self, height: u32) -> f64 {
        f64::from(height) * (1.0 - self.band_fraction)
    }

    /// Strategy 1: ascending numeral sequence in the legend band.
    ///
    /// Tick labels sitting on one row ("0  20  40") are grouped by y, and
    /// pixels-per-foot is the ratio of pixel spacing to value delta between
    /// adjacent labels. The spacings must agree with each other; a row of
    /// unrelated dimension callouts will not.
    fn from_labels(&self, height: u32, labels: &[ScaleLabel]) -> Option<f64> {
        let band_top = self.band_top(height);
        let mut numerals: Vec<(f64, f64, f64)> = labels
            .iter()
            .filter(|label| label.y >= band_top)
            .filter_map(|label| parse_numeral(&label.text).map(|v| (label.y, label.x, v)))
            .collect();
        if numerals.len() < 2 {
            return None;
        }

        // Group into rows by y proximity.
        numerals.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let row_tolerance = 20.0;
        let mut rows: Vec<Vec<(f64, f64)>> = Vec::new();
        let mut row_y = f64::NEG_INFINITY;
        for (y, x, v) in numerals {
            if (y - row_y).abs() > row_tolerance {
                rows.push(Vec::new());
                row_y = y;
            }
            if let Some(row) = rows.last_mut() {
                row.push((x, v));
            }
        }

        rows.sort_by_key(|row| std::cmp::Reverse(row.len()));
        rows.iter().find_map(|row| self.row_ratio(row))
    }

    fn row_ratio(&self, row: &[(f64, f64)]) -> Option<f64> {
        if row.len() < 2 {
            return None;
        }
        let mut row = row.to_vec();
        row.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut ratios = Vec::with_capacity(row.len() - 1);
        for pair in row.windows(2) {
            let (x0, v0) = pair[0];
            let (x1, v1) = pair[1];
            if v1 <= v0 {
                return None;
            }
            ratios.push((x1 - x0) / (v1 - v0));
        }

        let min = ratios.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = ratios.iter().cloned().fold(0.0, f64::max);
        if min <= 0.0 || max / min > MAX_SPACING_SPREAD {
            return None;
        }

        ratios.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = ratios[ratios.len() / 2];
        PPF_SANE.contains(&median).then_some(median)
    }

    /// Strategy 2: longest near-horizontal ink run in the legend band.
    fn from_bar(&self, gray: &GrayImage, labels: &[ScaleLabel]) -> Option<f64> {
        let band_top = self.band_top(gray.height()) as u32;
        if band_top >= gray.height() {
            return None;
        }

        let mut best_len = 0u32;
        let mut best_y = 0u32;
        for y in band_top..gray.height() {
            let (len, _start) = longest_dark_run(gray, y, self.ink_threshold);
            if len > best_len {
                best_len = len;
                best_y = y;
            }
        }
        if best_len < self.min_bar_px {
            return None;
        }

        // Nearest recognized numeral pair: the largest value labelled close
        // to the bar is taken as its full length in feet.
        let bar_feet = labels
            .iter()
            .filter(|label| (label.y - f64::from(best_y)).abs() < 50.0)
            .filter_map(|label| parse_numeral(&label.text))
            .fold(0.0, f64::max);
        let feet = if bar_feet > 0.0 { bar_feet } else { self.assumed_bar_feet };

        let ratio = f64::from(best_len) / feet;
        PPF_SANE.contains(&ratio).then_some(ratio)
    }
}

/// Parse a tick-mark label: an integer, optionally with a trailing foot
/// mark, e.g. `40` or `40'`.
fn parse_numeral(text: &str) -> Option<f64> {
    let trimmed = text.trim().trim_end_matches('\'').trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<u32>().ok().map(f64::from)
}

/// Longest horizontal run of ink pixels on one row, tolerating gaps of up
/// to 2 px (tick marks interrupt the bar).
fn longest_dark_run(gray: &GrayImage, y: u32, threshold: u8) -> (u32, u32) {
    let mut best = (0u32, 0u32);
    let mut run_start = 0u32;
    let mut run_len = 0u32;
    let mut gap = 0u32;
    for x in 0..gray.width() {
        if gray.get_pixel(x, y).0[0] < threshold {
            if run_len == 0 {
                run_start = x;
            }
            run_len += gap + 1;
            gap = 0;
        } else if run_len > 0 {
            gap += 1;
            if gap > 2 {
                if run_len > best.0 {
                    best = (run_len, run_start);
                }
                run_len = 0;
                gap = 0;
            }
        }
    }
    if run_len > best.0 {
        best = (run_len, run_start);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn white_sheet() -> GrayImage {
        GrayImage::from_pixel(1000, 1000, Luma([255u8]))
    }

    fn label(text: &str, x: f64, y: f64) -> ScaleLabel {
        ScaleLabel { text: text.to_string(), x, y }
    }

    #[test]
    fn tick_labels_give_text_recognized_scale() {
        let labels = vec![
            label("0", 100.0, 950.0),
            label("20", 400.0, 950.0),
            label("40", 700.0, 950.0),
        ];
        let calibration = ScaleDetector::default().detect(&white_sheet(), &labels);
        assert_eq!(calibration.provenance, ScaleProvenance::TextRecognized);
        assert!((calibration.pixels_per_foot - 15.0).abs() < 1e-9);
    }

    #[test]
    fn foot_marks_are_accepted() {
        let labels = vec![label("0'", 100.0, 960.0), label("40'", 700.0, 960.0)];
        let calibration = ScaleDetector::default().detect(&white_sheet(), &labels);
        assert_eq!(calibration.provenance, ScaleProvenance::TextRecognized);
        assert!((calibration.pixels_per_foot - 15.0).abs() < 1e-9);
    }

    #[test]
    fn labels_outside_legend_band_are_ignored() {
        let labels = vec![label("0", 100.0, 100.0), label("40", 700.0, 100.0)];
        let calibration = ScaleDetector::default().detect(&white_sheet(), &labels);
        assert_eq!(calibration.provenance, ScaleProvenance::Fallback);
    }

    #[test]
    fn inconsistent_spacing_is_rejected() {
        // Dimension callouts that happen to share a row.
        let labels = vec![
            label("0", 100.0, 950.0),
            label("20", 150.0, 950.0),
            label("40", 900.0, 950.0),
        ];
        let calibration = ScaleDetector::default().detect(&white_sheet(), &labels);
        assert_eq!(calibration.provenance, ScaleProvenance::Fallback);
    }

    #[test]
    fn bar_with_nearby_numeral_gives_graphical_scale() {
        let mut sheet = white_sheet();
        for x in 100..700 {
            sheet.put_pixel(x, 950, Luma([0u8]));
        }
        // A single numeral cannot form a tick row, but it labels the bar.
        let labels = vec![label("40", 700.0, 955.0)];
        let calibration = ScaleDetector::default().detect(&sheet, &labels);
        assert_eq!(calibration.provenance, ScaleProvenance::Graphical);
        assert!((calibration.pixels_per_foot - 600.0 / 40.0).abs() < 0.5);
    }

    #[test]
    fn unlabelled_bar_assumes_standard_length() {
        let mut sheet = white_sheet();
        for x in 200..800 {
            sheet.put_pixel(x, 930, Luma([0u8]));
        }
        let calibration = ScaleDetector::default().detect(&sheet, &[]);
        assert_eq!(calibration.provenance, ScaleProvenance::Graphical);
        assert!((calibration.pixels_per_foot - 600.0 / 40.0).abs() < 0.5);
    }

    #[test]
    fn blank_sheet_falls_back_to_standard_plan_scale() {
        let calibration = ScaleDetector::default().detect(&white_sheet(), &[]);
        assert_eq!(calibration.provenance, ScaleProvenance::Fallback);
        // 1" = 20' at 300 dpi.
        assert!((calibration.pixels_per_foot - 15.0).abs() < 1e-9);
    }

    #[test]
    fn bar_run_tolerates_tick_gaps() {
        let mut sheet = white_sheet();
        for x in 100..700 {
            if x % 150 < 2 {
                continue; // tick interruptions
            }
            sheet.put_pixel(x, 950, Luma([0u8]));
        }
        let (len, start) = longest_dark_run(&sheet, 950, 128);
        assert_eq!(start, 100);
        assert!(len > 500);
    }
}
