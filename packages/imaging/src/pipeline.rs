//! The fixed-order transformation chain.
//!
//! ```text
//! resize → blur → brightness → contrast → grayscale → sepia → invert
//!        → rotate → flip horizontal → flip vertical
//! ```
//!
//! [`plan`] decides which stages a request turns on; [`apply`] folds the image
//! through them. A failing stage aborts the whole chain.

use std::fmt;

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::trace;

use crate::error::ImagingError;
use crate::request::TransformRequest;

/// Largest accepted resize target on either axis.
pub const MAX_DIMENSION: u32 = 16_384;

/// Largest accepted blur radius.
pub const MAX_BLUR_RADIUS: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    /// Bilinear resize to exactly `width` x `height`; aspect ratio is not preserved.
    Resize { width: u32, height: u32 },
    Blur(f32),
    /// Scales every colour channel by `1 + value`: `-1.0` is black, `1.0` doubles.
    Brightness(f32),
    /// Stretches channels away from mid-grey by `1 + value`: `-1.0` flattens
    /// to grey, `0.0` is a no-op.
    Contrast(f32),
    Grayscale,
    Sepia,
    Invert,
    /// Clockwise degrees about the centre, canvas size unchanged.
    Rotate(f32),
    FlipHorizontal,
    FlipVertical,
}

/// Stages a request enables, in execution order.
pub fn plan(request: &TransformRequest) -> Vec<Stage> {
    let mut stages = Vec::new();

    if let (Some(width), Some(height)) = (request.width, request.height)
        && width > 0
        && height > 0
    {
        stages.push(Stage::Resize { width, height });
    }
    if let Some(radius) = request.blur
        && radius > 0.0
    {
        stages.push(Stage::Blur(radius));
    }
    if let Some(value) = request.brightness {
        stages.push(Stage::Brightness(value));
    }
    if let Some(value) = request.contrast {
        stages.push(Stage::Contrast(value));
    }
    if request.grayscale {
        stages.push(Stage::Grayscale);
    }
    if request.sepia {
        stages.push(Stage::Sepia);
    }
    if request.invert {
        stages.push(Stage::Invert);
    }
    if let Some(degrees) = request.rotate {
        stages.push(Stage::Rotate(degrees));
    }
    if request.fliph {
        stages.push(Stage::FlipHorizontal);
    }
    if request.flipv {
        stages.push(Stage::FlipVertical);
    }

    stages
}

/// Run every enabled stage over `image`.
pub fn apply(image: DynamicImage, request: &TransformRequest) -> Result<DynamicImage, ImagingError> {
    plan(request)
        .into_iter()
        .try_fold(image, |img, stage| stage.apply(img))
}

impl Stage {
    pub fn apply(self, image: DynamicImage) -> Result<DynamicImage, ImagingError> {
        trace!(stage = %self, width = image.width(), height = image.height(), "applying stage");

        let out = match self {
            Stage::Resize { width, height } => {
                if width > MAX_DIMENSION || height > MAX_DIMENSION {
                    return Err(ImagingError::Transform(format!(
                        "resize to {width}x{height} exceeds the {MAX_DIMENSION}px limit"
                    )));
                }
                image.resize_exact(width, height, FilterType::Triangle)
            }
            Stage::Blur(radius) => {
                if radius > MAX_BLUR_RADIUS {
                    return Err(ImagingError::Transform(format!(
                        "blur radius {radius} exceeds the limit of {MAX_BLUR_RADIUS}"
                    )));
                }
                image.blur(radius)
            }
            Stage::Brightness(value) => {
                let factor = 1.0 + f64::from(value);
                map_channels(image, &lookup(|i| i * factor))
            }
            Stage::Contrast(value) => {
                let factor = 1.0 + f64::from(value);
                map_channels(image, &lookup(|i| ((i / 255.0 - 0.5) * factor + 0.5) * 255.0))
            }
            Stage::Grayscale => image.grayscale(),
            Stage::Sepia => sepia(&image),
            Stage::Invert => {
                let mut image = image;
                image.invert();
                image
            }
            Stage::Rotate(degrees) => rotate_about_center(image, degrees),
            Stage::FlipHorizontal => image.fliph(),
            Stage::FlipVertical => image.flipv(),
        };

        Ok(out)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resize { width, height } => write!(f, "resize({width}x{height})"),
            Stage::Blur(r) => write!(f, "blur({r})"),
            Stage::Brightness(v) => write!(f, "brightness({v})"),
            Stage::Contrast(v) => write!(f, "contrast({v})"),
            Stage::Grayscale => f.write_str("grayscale"),
            Stage::Sepia => f.write_str("sepia"),
            Stage::Invert => f.write_str("invert"),
            Stage::Rotate(d) => write!(f, "rotate({d})"),
            Stage::FlipHorizontal => f.write_str("fliph"),
            Stage::FlipVertical => f.write_str("flipv"),
        }
    }
}

/// Per-channel table for a tone curve. Results are clamped to `0..=255` and
/// truncated.
fn lookup(curve: impl Fn(f64) -> f64) -> [u8; 256] {
    std::array::from_fn(|i| curve(i as f64).clamp(0.0, 255.0) as u8)
}

/// Remap colour channels through `table`, leaving alpha untouched.
fn map_channels(image: DynamicImage, table: &[u8; 256]) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(mut rgb) => {
            for pixel in rgb.pixels_mut() {
                for channel in pixel.0.iter_mut() {
                    *channel = table[usize::from(*channel)];
                }
            }
            DynamicImage::ImageRgb8(rgb)
        }
        other => {
            let mut rgba = other.to_rgba8();
            for pixel in rgba.pixels_mut() {
                for channel in pixel.0[..3].iter_mut() {
                    *channel = table[usize::from(*channel)];
                }
            }
            DynamicImage::ImageRgba8(rgba)
        }
    }
}

fn sepia(image: &DynamicImage) -> DynamicImage {
    let mut rgba = image.to_rgba8();
    for pixel in rgba.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
        let tone = |kr: f32, kg: f32, kb: f32| (r * kr + g * kg + b * kb).round().min(255.0) as u8;
        pixel.0 = [
            tone(0.393, 0.769, 0.189),
            tone(0.349, 0.686, 0.168),
            tone(0.272, 0.534, 0.131),
            a,
        ];
    }
    DynamicImage::ImageRgba8(rgba)
}

/// Inverse-map every destination pixel into the source. Pixels whose source
/// falls outside the canvas become fully transparent.
fn rotate_about_center(image: DynamicImage, degrees: f32) -> DynamicImage {
    if degrees % 360.0 == 0.0 {
        return image;
    }

    let src = image.to_rgba8();
    let (w, h) = src.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);

    let out = RgbaImage::from_fn(w, h, |x, y| {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let sx = cos * dx + sin * dy + cx - 0.5;
        let sy = -sin * dx + cos * dy + cy - 0.5;
        sample_bilinear(&src, sx, sy).unwrap_or(Rgba([0, 0, 0, 0]))
    });

    DynamicImage::ImageRgba8(out)
}

fn sample_bilinear(src: &RgbaImage, x: f32, y: f32) -> Option<Rgba<u8>> {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    if x < -0.5 || y < -0.5 || x > w as f32 - 0.5 || y > h as f32 - 0.5 {
        return None;
    }

    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);

    let tl = src.get_pixel(x0, y0).0;
    let tr = src.get_pixel(x1, y0).0;
    let bl = src.get_pixel(x0, y1).0;
    let br = src.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for (i, channel) in out.iter_mut().enumerate() {
        let top = f32::from(tl[i]) * (1.0 - fx) + f32::from(tr[i]) * fx;
        let bottom = f32::from(bl[i]) * (1.0 - fx) + f32::from(br[i]) * fx;
        *channel = (top * (1.0 - fy) + bottom * fy).round() as u8;
    }
    Some(Rgba(out))
}
