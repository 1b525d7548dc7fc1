//! Palette image export: one swatch per color with its hex code underneath.

use std::io::Cursor;
use std::path::Path;

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use anyhow::{bail, Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::info;

use crate::color::Color;

pub const PALETTE_FILE_NAME: &str = "color-palette.png";

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 400;
/// Swatches cover rows `[0, SWATCH_HEIGHT)`.
pub const SWATCH_HEIGHT: u32 = 300;
/// Labels sit on this baseline.
pub const LABEL_BASELINE: u32 = 340;
/// Label glyph height in pixels.
pub const LABEL_SIZE: f32 = 24.0;

const LABEL_FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_INK: Rgb<u8> = Rgb([0, 0, 0]);

/// The monospace face hex labels are set in.
pub fn label_font() -> Result<FontRef<'static>> {
    FontRef::try_from_slice(LABEL_FONT_BYTES).context("embedded label font is unreadable")
}

/// Column span `[start, end)` of block `index` out of `count`.
pub fn block_span(index: usize, count: usize) -> (u32, u32) {
    let count = count.max(1) as u64;
    let at = |i: u64| (i * u64::from(WIDTH) / count) as u32;
    (at(index as u64), at(index as u64 + 1))
}

/// Render the palette as an 800x400 image. `None` for an empty palette.
pub fn render_palette(colors: &[Color]) -> Result<Option<RgbImage>> {
    if colors.is_empty() {
        return Ok(None);
    }
    let font = label_font()?;

    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    for (i, color) in colors.iter().enumerate() {
        let (x0, x1) = block_span(i, colors.len());
        if x1 > x0 {
            draw_filled_rect_mut(
                &mut img,
                Rect::at(x0 as i32, 0).of_size(x1 - x0, SWATCH_HEIGHT),
                Rgb([color.r, color.g, color.b]),
            );
        }
        let center = (x0 + x1) / 2;
        draw_label(&mut img, &font, &color.to_hex(), center, LABEL_BASELINE);
    }
    Ok(Some(img))
}

/// Top-left pen position that centers `label` on `center_x` with its
/// baseline on `baseline`.
pub fn label_origin(font: &FontRef<'_>, label: &str, center_x: u32, baseline: u32) -> (i32, i32) {
    let scale = PxScale::from(LABEL_SIZE);
    let (width, _) = text_size(scale, font, label);
    let ascent = font.as_scaled(scale).ascent();
    (
        center_x as i32 - (width / 2) as i32,
        baseline as i32 - ascent.round() as i32,
    )
}

/// Glyphs falling outside the image are clipped by imageproc.
fn draw_label(img: &mut RgbImage, font: &FontRef<'_>, label: &str, center_x: u32, baseline: u32) {
    let (x, y) = label_origin(font, label, center_x, baseline);
    draw_text_mut(img, LABEL_INK, x, y, PxScale::from(LABEL_SIZE), font, label);
}

/// Encode an image as PNG bytes.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .context("failed to encode palette as PNG")?;
    Ok(buf)
}

/// Render `colors` and write the PNG to `path`.
pub fn write_palette_png(colors: &[Color], path: &Path) -> Result<()> {
    let Some(img) = render_palette(colors)? else {
        bail!("no colors to export");
    };
    let bytes = encode_png(&img)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write palette to {}", path.display()))?;
    info!(path = %path.display(), colors = colors.len(), "exported palette");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pixels dark enough to be label ink once antialiased.
    fn ink_in(img: &RgbImage, x0: u32, x1: u32, y0: u32, y1: u32) -> usize {
        let mut n = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                let [r, g, b] = img.get_pixel(x, y).0;
                if u32::from(r) + u32::from(g) + u32::from(b) < 3 * 128 {
                    n += 1;
                }
            }
        }
        n
    }

    /// Rows `[SWATCH_HEIGHT, HEIGHT)` of a white canvas with only `label` drawn.
    fn lone_label(label: &str, center_x: u32) -> RgbImage {
        let font = label_font().unwrap();
        let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
        let scale = PxScale::from(LABEL_SIZE);
        let (width, _) = text_size(scale, &font, label);
        let top = LABEL_BASELINE as i32 - font.as_scaled(scale).ascent().round() as i32;
        draw_text_mut(
            &mut img,
            LABEL_INK,
            center_x as i32 - (width / 2) as i32,
            top,
            scale,
            &font,
            label,
        );
        img
    }

    fn same_strip(a: &RgbImage, b: &RgbImage, x0: u32, x1: u32) -> bool {
        (SWATCH_HEIGHT..HEIGHT).all(|y| (x0..x1).all(|x| a.get_pixel(x, y) == b.get_pixel(x, y)))
    }

    #[test]
    fn embedded_font_covers_hex_digits() {
        let font = label_font().unwrap();
        for c in "#0123456789abcdef".chars() {
            assert_ne!(font.glyph_id(c).0, 0, "no glyph for {c:?}");
        }
    }

    #[test]
    fn empty_palette_renders_nothing() {
        assert!(render_palette(&[]).unwrap().is_none());
    }

    #[test]
    fn blocks_split_width_evenly() {
        assert_eq!(block_span(0, 2), (0, 400));
        assert_eq!(block_span(1, 2), (400, 800));
        assert_eq!(block_span(0, 3), (0, 266));
        assert_eq!(block_span(2, 3), (533, 800));
    }

    #[test]
    fn two_color_palette_layout() {
        let img = render_palette(&[Color::new(255, 0, 0), Color::new(0, 255, 0)])
            .unwrap()
            .unwrap();
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));

        assert_eq!(*img.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(399, 299), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(400, 0), Rgb([0, 255, 0]));
        assert_eq!(*img.get_pixel(799, 299), Rgb([0, 255, 0]));

        // Below the swatches: white except for the labels.
        assert_eq!(*img.get_pixel(0, 300), BACKGROUND);
        assert_eq!(*img.get_pixel(799, 399), BACKGROUND);
        assert!(ink_in(&img, 0, 400, 300, 400) > 0);
        assert!(ink_in(&img, 400, 800, 300, 400) > 0);
        assert_eq!(ink_in(&img, 0, 800, 343, 400), 0, "nothing below the baseline");
    }

    #[test]
    fn labels_read_as_each_blocks_hex() {
        let img = render_palette(&[Color::new(255, 0, 0), Color::new(0, 255, 0)])
            .unwrap()
            .unwrap();

        assert!(same_strip(&img, &lone_label("#ff0000", 200), 0, 400));
        assert!(same_strip(&img, &lone_label("#00ff00", 600), 400, 800));
        // The strips are not interchangeable.
        assert!(!same_strip(&img, &lone_label("#00ff00", 200), 0, 400));
    }

    #[test]
    fn label_is_centered_in_its_block() {
        let img = render_palette(&[Color::new(1, 2, 3)]).unwrap().unwrap();
        let font = label_font().unwrap();
        let (left, _) = label_origin(&font, "#010203", 400, LABEL_BASELINE);
        let left = left as u32;
        let right = 800 - left;
        assert!(ink_in(&img, left, right, 320, 341) > 0);
        assert_eq!(ink_in(&img, 0, left.saturating_sub(2), 300, 400), 0);
        assert_eq!(ink_in(&img, right + 2, 800, 300, 400), 0);
    }

    #[test]
    fn rendering_is_deterministic() {
        let colors = [Color::new(255, 0, 0), Color::new(0, 255, 0)];
        let a = encode_png(&render_palette(&colors).unwrap().unwrap()).unwrap();
        let b = encode_png(&render_palette(&colors).unwrap().unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn write_refuses_empty_palette() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PALETTE_FILE_NAME);
        assert!(write_palette_png(&[], &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn write_creates_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PALETTE_FILE_NAME);
        write_palette_png(&[Color::new(10, 20, 30)], &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (WIDTH, HEIGHT));
        assert_eq!(*decoded.get_pixel(10, 10), Rgb([10, 20, 30]));
    }
}
