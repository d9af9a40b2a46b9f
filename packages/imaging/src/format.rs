//! Output format negotiation, decoding and encoding.
//!
//! The output container is the explicit `format` request token when present,
//! otherwise the format the blob was stored as. JPEG always encodes at
//! [`JPEG_QUALITY`]; PNG is lossless with the encoder's default compression.

use std::borrow::Cow;
use std::fmt;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat};

use crate::error::ImagingError;

/// Fixed JPEG quality for every response.
pub const JPEG_QUALITY: u8 = 75;

/// Tokens accepted both at upload and as the `format` request parameter.
pub const SUPPORTED_FORMATS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Map a format token (`jpg`, `jpeg`, `png`, any ASCII case) to a format.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        })
    }
}

fn unsupported(token: &str) -> ImagingError {
    ImagingError::UnsupportedFormat {
        format: token.to_string(),
        supported: SUPPORTED_FORMATS.join(", "),
    }
}

/// Pick the output format: a non-empty `explicit` token, else `fallback`.
pub fn negotiate(explicit: Option<&str>, fallback: &str) -> Result<OutputFormat, ImagingError> {
    let token = explicit.filter(|t| !t.is_empty()).unwrap_or(fallback);
    OutputFormat::from_token(token).ok_or_else(|| unsupported(token))
}

/// Decode `data` as the format it was stored under.
pub fn decode(data: &[u8], stored_format: &str) -> Result<DynamicImage, ImagingError> {
    let format = OutputFormat::from_token(stored_format).ok_or_else(|| ImagingError::Decode {
        format: stored_format.to_string(),
        reason: "unknown stored format".into(),
    })?;

    image::load_from_memory_with_format(data, format.image_format()).map_err(|e| {
        ImagingError::Decode {
            format: stored_format.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Encoded response body plus its MIME type.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

pub fn encode(image: &DynamicImage, format: OutputFormat) -> Result<EncodedImage, ImagingError> {
    let mut bytes = Vec::new();
    let result = match format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
            jpeg_compatible(image).write_with_encoder(encoder)
        }
        OutputFormat::Png => image.write_with_encoder(PngEncoder::new(&mut bytes)),
    };
    result.map_err(|e| ImagingError::Encode(e.to_string()))?;

    Ok(EncodedImage {
        bytes,
        mime_type: format.mime_type(),
    })
}

/// JPEG has no alpha channel and no 16-bit mode; flatten anything else to RGB8.
/// Transparent pixels (e.g. rotation fill) become black.
fn jpeg_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(image),
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}
