use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use serde::Serialize;

/// Axis-aligned box believed to hold one line or token of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    fn from_contour(contour: &Contour<u32>) -> Option<Self> {
        let first = contour.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &contour.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Region {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    /// Copy this region out of `image`, clamped to its bounds.
    pub fn crop(&self, image: &GrayImage) -> GrayImage {
        image::imageops::crop_imm(image, self.x, self.y, self.width, self.height).to_image()
    }
}

/// Segments a binarized receipt into candidate text boxes.
#[derive(Debug, Clone)]
pub struct RegionDetector {
    /// Boxes this wide or narrower are dropped.
    pub min_width: u32,
    /// Boxes this tall or shorter are dropped.
    pub min_height: u32,
}

impl Default for RegionDetector {
    fn default() -> Self {
        Self { min_width: 50, min_height: 10 }
    }
}

impl RegionDetector {
    pub fn new(min_width: u32, min_height: u32) -> Self {
        Self { min_width, min_height }
    }

    /// Bounding boxes of the external ink contours, top to bottom.
    ///
    /// Expects ink as dark pixels on a light background, as produced by
    /// [`crate::enhance::enhance`]. Equal `y` keeps discovery order.
    pub fn detect(&self, binary: &GrayImage) -> Vec<Region> {
        let ink: GrayImage = ImageBuffer::from_fn(binary.width(), binary.height(), |x, y| {
            if binary.get_pixel(x, y)[0] < 128 {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        let mut regions: Vec<Region> = find_contours::<u32>(&ink)
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(Region::from_contour)
            .filter(|r| r.width > self.min_width && r.height > self.min_height)
            .collect();

        regions.sort_by_key(|r| r.y);
        regions
    }
}
