use image::GrayImage;
use imageproc::contours::BorderType;

use crate::{error::Result, traits::ContourTracer, types::Region};

/// Imageproc-based contour tracer that keeps only outer borders.
///
/// Inner borders are the far side of the same boundary line; dropping them
/// here is the first level of nested-duplicate suppression.
#[derive(Debug, Clone, Default)]
pub struct OuterContourTracer;

impl ContourTracer for OuterContourTracer {
    fn trace(&self, binary: &GrayImage) -> Result<Vec<Region>> {
        let contours = imageproc::contours::find_contours::<i32>(binary);

        let regions = contours
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer)
            .map(|contour| {
                Region::new(
                    contour
                        .points
                        .iter()
                        .map(|p| [f64::from(p.x), f64::from(p.y)])
                        .collect(),
                )
            })
            .filter(|region| region.vertices.len() >= 3)
            .collect();

        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn traces_a_filled_square() {
        let mut img = GrayImage::new(50, 50);
        for y in 10..40 {
            for x in 10..40 {
                img.put_pixel(x, y, Luma([255u8]));
            }
        }

        let regions = OuterContourTracer.trace(&img).unwrap();
        assert_eq!(regions.len(), 1);
        // Traced boundary area is close to the filled 30x30 block.
        let area = regions[0].pixel_area();
        assert!(area > 700.0 && area < 900.0, "area was {area}");
    }

    #[test]
    fn blank_image_yields_no_regions() {
        let img = GrayImage::new(32, 32);
        assert!(OuterContourTracer.trace(&img).unwrap().is_empty());
    }
}
