use crate::processing::post::Detection;
use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

/// Box colours cycled by class id.
const PALETTE: [[u8; 3]; 20] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [146, 204, 23],
    [61, 219, 134],
    [26, 147, 52],
    [0, 212, 187],
    [44, 153, 168],
    [0, 194, 255],
    [52, 69, 147],
    [100, 115, 255],
    [0, 24, 236],
    [132, 56, 255],
    [82, 0, 133],
    [203, 56, 255],
    [255, 149, 200],
    [255, 55, 199],
];

const MIN_LINE_WIDTH: u32 = 2;

/// Draws detection boxes onto the source image.
#[derive(Debug, Default, Clone, Copy)]
pub struct Annotator;

impl Annotator {
    pub fn color_for(class_id: u32) -> Rgb<u8> {
        Rgb(PALETTE[class_id as usize % PALETTE.len()])
    }

    /// Line width scales with the image, roughly 0.3% of the mean side.
    fn line_width(image: &RgbImage) -> u32 {
        let mean_side = (image.width() + image.height()) as f32 / 2.0;
        ((mean_side * 0.003).round() as u32).max(MIN_LINE_WIDTH)
    }

    pub fn annotate(&self, image: &mut RgbImage, detections: &[Detection]) {
        let line_width = Self::line_width(image);

        for det in detections {
            let color = Self::color_for(det.class_id);

            let x = det.x1.floor() as i32;
            let y = det.y1.floor() as i32;
            let w = (det.x2.ceil() - det.x1.floor()) as i32;
            let h = (det.y2.ceil() - det.y1.floor()) as i32;

            for t in 0..line_width as i32 {
                let (rw, rh) = (w - 2 * t, h - 2 * t);
                if rw <= 0 || rh <= 0 {
                    break;
                }
                let rect = Rect::at(x + t, y + t).of_size(rw as u32, rh as u32);
                draw_hollow_rect_mut(image, rect, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32, class_id: u32) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
            class_id,
        }
    }

    #[test]
    fn test_annotate_draws_box_edges_only() {
        let mut image = RgbImage::new(100, 100);
        Annotator.annotate(&mut image, &[detection(10.0, 10.0, 60.0, 60.0, 0)]);

        let color = Annotator::color_for(0);
        assert_eq!(*image.get_pixel(10, 10), color, "top-left corner");
        assert_eq!(*image.get_pixel(30, 10), color, "top edge");
        assert_eq!(*image.get_pixel(10, 30), color, "left edge");
        assert_eq!(*image.get_pixel(30, 30), Rgb([0, 0, 0]), "interior untouched");
        assert_eq!(*image.get_pixel(80, 80), Rgb([0, 0, 0]), "outside untouched");
    }

    #[test]
    fn test_palette_cycles_by_class() {
        assert_eq!(Annotator::color_for(0), Annotator::color_for(20));
        assert_ne!(Annotator::color_for(0), Annotator::color_for(1));
    }

    #[test]
    fn test_tiny_and_edge_boxes_do_not_panic() {
        let mut image = RgbImage::new(16, 16);
        Annotator.annotate(
            &mut image,
            &[
                detection(0.0, 0.0, 16.0, 16.0, 3),
                detection(5.0, 5.0, 5.5, 5.5, 4),
            ],
        );
        assert_eq!(*image.get_pixel(0, 0), Annotator::color_for(3));
    }
}
