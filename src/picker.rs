use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use palette::Srgb;

use crate::color::Color;
use crate::region::Region;

/// Decode an image for sampling.
pub fn load(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).with_context(|| {
        if !path.exists() {
            format!("file not found: {}", path.display())
        } else {
            format!("unsupported or corrupt image: {}", path.display())
        }
    })?;
    Ok(img.to_rgb8())
}

/// Pixel under a normalized point. Returns `None` for an empty image.
pub fn sample(img: &RgbImage, at: Region) -> Option<Color> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let x = ((at.x * w as f32) as u32).min(w - 1);
    let y = ((at.y * h as f32) as u32).min(h - 1);
    let [r, g, b] = img.get_pixel(x, y).0;
    Some(Color::from_srgb_u8(Srgb::new(r, g, b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadrants() -> RgbImage {
        RgbImage::from_fn(4, 4, |x, y| match (x < 2, y < 2) {
            (true, true) => image::Rgb([255, 0, 0]),
            (false, true) => image::Rgb([0, 255, 0]),
            (true, false) => image::Rgb([0, 0, 255]),
            (false, false) => image::Rgb([255, 255, 255]),
        })
    }

    #[test]
    fn samples_each_quadrant() {
        let img = quadrants();
        assert_eq!(sample(&img, Region::new(0.1, 0.1)), Some(Color::new(255, 0, 0)));
        assert_eq!(sample(&img, Region::new(0.9, 0.1)), Some(Color::new(0, 255, 0)));
        assert_eq!(sample(&img, Region::new(0.1, 0.9)), Some(Color::new(0, 0, 255)));
        assert_eq!(sample(&img, Region::CENTER), Some(Color::WHITE));
    }

    #[test]
    fn far_edge_maps_to_last_pixel() {
        let img = quadrants();
        assert_eq!(sample(&img, Region::new(1.0, 1.0)), Some(Color::WHITE));
    }

    #[test]
    fn empty_image_has_nothing_to_sample() {
        assert_eq!(sample(&RgbImage::new(0, 0), Region::CENTER), None);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load(Path::new("/nonexistent/image.png")).unwrap_err().to_string();
        assert!(err.contains("file not found"), "got: {err}");
    }
}
