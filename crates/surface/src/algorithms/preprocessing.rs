use image::GrayImage;
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;

use crate::{error::Result, traits::PagePreprocessor};

/// Gaussian blur preprocessor for scan-noise suppression.
#[derive(Debug, Clone)]
pub struct GaussianBlurPreprocessor {
    pub sigma: f32,
}

impl Default for GaussianBlurPreprocessor {
    fn default() -> Self {
        Self { sigma: 1.4 }
    }
}

impl PagePreprocessor for GaussianBlurPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::filter::gaussian_blur_f32(image, self.sigma))
    }
}

/// Plain binary threshold preprocessor.
///
/// With `invert` set, dark pixels become foreground — the right polarity for
/// ink on a white plan sheet.
#[derive(Debug, Clone)]
pub struct BinaryThresholdPreprocessor {
    pub threshold: u8,
    pub invert: bool,
}

impl Default for BinaryThresholdPreprocessor {
    fn default() -> Self {
        Self {
            threshold: 128,
            invert: false,
        }
    }
}

impl PagePreprocessor for BinaryThresholdPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let kind = if self.invert {
            ThresholdType::BinaryInverted
        } else {
            ThresholdType::Binary
        };
        Ok(threshold(image, self.threshold, kind))
    }
}

/// Combined ink-mask builder: unions an inverted threshold (filled and
/// hatched areas) with a Canny edge map (thin outlines), so both shaded
/// regions and line-drawn boundaries survive into contour tracing.
#[derive(Debug, Clone)]
pub struct InkAndEdgePreprocessor {
    pub ink_threshold: u8,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for InkAndEdgePreprocessor {
    fn default() -> Self {
        Self {
            ink_threshold: 200,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

impl PagePreprocessor for InkAndEdgePreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let ink = threshold(image, self.ink_threshold, ThresholdType::BinaryInverted);
        let edges = imageproc::edges::canny(image, self.canny_low, self.canny_high);

        let mut merged = ink;
        for (merged_px, edge_px) in merged.pixels_mut().zip(edges.pixels()) {
            if edge_px.0[0] > 0 {
                merged_px.0[0] = 255;
            }
        }
        Ok(merged)
    }
}

/// Morphological closing, bridging small gaps in traced linework so hatch
/// patterns merge into solid regions.
#[derive(Debug, Clone)]
pub struct MorphClosePreprocessor {
    pub radius: u8,
}

impl Default for MorphClosePreprocessor {
    fn default() -> Self {
        Self { radius: 3 }
    }
}

impl PagePreprocessor for MorphClosePreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::morphology::close(image, Norm::LInf, self.radius))
    }
}

/// Morphological opening, removing speckle noise left after closing.
#[derive(Debug, Clone)]
pub struct MorphOpenPreprocessor {
    pub radius: u8,
}

impl Default for MorphOpenPreprocessor {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

impl PagePreprocessor for MorphOpenPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::morphology::open(image, Norm::LInf, self.radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn inverted_threshold_picks_up_ink() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([255u8]));
        img.put_pixel(5, 5, Luma([0u8]));

        let binary = BinaryThresholdPreprocessor { threshold: 128, invert: true }
            .preprocess(&img)
            .unwrap();
        assert_eq!(binary.get_pixel(5, 5).0[0], 255);
        assert_eq!(binary.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn closing_bridges_small_gaps() {
        // Two foreground blocks separated by a 2px gap.
        let mut img = GrayImage::new(20, 20);
        for y in 5..15 {
            for x in 2..9 {
                img.put_pixel(x, y, Luma([255u8]));
            }
            for x in 11..18 {
                img.put_pixel(x, y, Luma([255u8]));
            }
        }

        let closed = MorphClosePreprocessor { radius: 2 }.preprocess(&img).unwrap();
        assert_eq!(closed.get_pixel(9, 10).0[0], 255);
        assert_eq!(closed.get_pixel(10, 10).0[0], 255);
    }
}
