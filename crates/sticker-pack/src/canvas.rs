//! Canvas normalizer
//!
//! Fits an arbitrary source image onto a fixed-size transparent canvas,
//! centered and aspect-preserving, and emits the result as a PNG data URL.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, RgbaImage};
use sticker_core::{Result, StickerError};

pub const STICKER_WIDTH: u32 = 370;
pub const STICKER_HEIGHT: u32 = 320;
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Where a scaled source lands on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// Target canvas dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(STICKER_WIDTH, STICKER_HEIGHT)
    }
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Compute the placement of a `src_w` x `src_h` source.
    ///
    /// `scale = min(tw / sw, th / sh)`; scaled sides are truncated toward
    /// zero and clamped to at least 1, offsets are the truncated half of
    /// the leftover space. Evaluated in integers so the truncation is
    /// exact.
    pub fn layout(&self, src_w: u32, src_h: u32) -> Result<Placement> {
        if src_w == 0 || src_h == 0 {
            return Err(StickerError::InvalidImage(format!(
                "source has zero size ({}x{})",
                src_w, src_h
            )));
        }
        let (tw, th) = (u64::from(self.width), u64::from(self.height));
        let (sw, sh) = (u64::from(src_w), u64::from(src_h));

        // tw/sw <= th/sh  <=>  tw*sh <= th*sw
        let (w, h) = if tw * sh <= th * sw {
            (tw, sh * tw / sw)
        } else {
            (sw * th / sh, th)
        };
        let width = (w.max(1)) as u32;
        let height = (h.max(1)) as u32;

        Ok(Placement {
            width,
            height,
            x: self.width.saturating_sub(width) / 2,
            y: self.height.saturating_sub(height) / 2,
        })
    }

    /// Resize with Catmull-Rom and composite over a transparent canvas
    pub fn normalize(&self, source: &DynamicImage) -> Result<RgbaImage> {
        let (src_w, src_h) = source.dimensions();
        let placement = self.layout(src_w, src_h)?;

        let scaled = source
            .resize_exact(placement.width, placement.height, FilterType::CatmullRom)
            .to_rgba8();
        let mut canvas = RgbaImage::new(self.width, self.height);
        imageops::overlay(
            &mut canvas,
            &scaled,
            i64::from(placement.x),
            i64::from(placement.y),
        );
        Ok(canvas)
    }

    /// Decode arbitrary image bytes and return the normalized canvas as PNG
    pub fn normalize_png(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let source = image::load_from_memory(bytes)
            .map_err(|e| StickerError::InvalidImage(format!("cannot decode image: {}", e)))?;
        encode_png(&self.normalize(&source)?)
    }

    /// Like [`Canvas::normalize_png`], emitted as a PNG data URL
    pub fn normalize_bytes(&self, bytes: &[u8]) -> Result<String> {
        Ok(png_data_url(&self.normalize_png(bytes)?))
    }
}

/// Encode an RGBA buffer as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| StickerError::InvalidImage(format!("png encode failed: {}", e)))?;
    Ok(bytes)
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, BASE64.encode(png))
}

/// True if `bytes` decode to an image of exactly `width` x `height`
pub fn png_has_size(bytes: &[u8], width: u32, height: u32) -> bool {
    image::load_from_memory(bytes)
        .map(|img| img.dimensions() == (width, height))
        .unwrap_or(false)
}

/// True if `bytes` decode to an image carrying an alpha channel
pub fn png_has_alpha(bytes: &[u8]) -> bool {
    image::load_from_memory(bytes)
        .map(|img| img.color().has_alpha())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    fn opaque_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        bytes
    }

    fn decode_data_url(url: &str) -> Vec<u8> {
        BASE64
            .decode(url.strip_prefix(PNG_DATA_URL_PREFIX).unwrap())
            .unwrap()
    }

    #[test]
    fn test_layout_width_bound() {
        // scale = min(370/1000, 320/500) = 0.37
        let placement = Canvas::default().layout(1000, 500).unwrap();
        assert_eq!(
            placement,
            Placement {
                width: 370,
                height: 185,
                x: 0,
                y: 67
            }
        );
    }

    #[test]
    fn test_layout_height_bound() {
        let placement = Canvas::default().layout(500, 1000).unwrap();
        assert_eq!(
            placement,
            Placement {
                width: 160,
                height: 320,
                x: 105,
                y: 0
            }
        );
    }

    #[test]
    fn test_layout_upscales_small_sources() {
        let placement = Canvas::default().layout(37, 16).unwrap();
        assert_eq!((placement.width, placement.height), (370, 160));
        assert_eq!((placement.x, placement.y), (0, 80));
    }

    #[test]
    fn test_layout_clamps_to_one_pixel() {
        let placement = Canvas::default().layout(100_000, 1).unwrap();
        assert_eq!(placement.width, 370);
        assert_eq!(placement.height, 1);
        assert_eq!(placement.y, 159);
    }

    #[test]
    fn test_layout_rejects_zero_size() {
        assert!(matches!(
            Canvas::default().layout(0, 10),
            Err(StickerError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_normalize_centers_on_transparent_canvas() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(1000, 500, Rgb([0, 0, 255])));
        let canvas = Canvas::default().normalize(&source).unwrap();
        assert_eq!(canvas.dimensions(), (370, 320));
        // Above the placed band is untouched
        assert_eq!(canvas.get_pixel(185, 10), &Rgba([0, 0, 0, 0]));
        // Center of the band is the source color, fully opaque
        assert_eq!(canvas.get_pixel(185, 160), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_normalize_bytes_emits_sized_png_with_alpha() {
        let url = Canvas::default()
            .normalize_bytes(&opaque_png(640, 480))
            .unwrap();
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));
        let png = decode_data_url(&url);
        assert!(png_has_size(&png, 370, 320));
        assert!(png_has_alpha(&png));
    }

    #[test]
    fn test_normalize_png_to_custom_canvas() {
        let png = Canvas::new(64, 64).normalize_png(&opaque_png(10, 40)).unwrap();
        assert!(png_has_size(&png, 64, 64));
        assert!(png_has_alpha(&png));
    }

    #[test]
    fn test_normalize_bytes_rejects_garbage() {
        assert!(matches!(
            Canvas::default().normalize_bytes(b"<html>not an image</html>"),
            Err(StickerError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_png_helpers() {
        let png = opaque_png(4, 3);
        assert!(png_has_size(&png, 4, 3));
        assert!(!png_has_size(&png, 3, 4));
        assert!(!png_has_alpha(&png));
        assert!(!png_has_size(b"nope", 1, 1));
    }
}
