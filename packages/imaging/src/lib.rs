//! Read-time image processing.
//!
//! | Stage | Implementation |
//! |---|---|
//! | Parse query | [`TransformRequest::from_pairs`], malformed values become absent |
//! | Decode | `image::load_from_memory_with_format` using the stored format |
//! | Transform | [`pipeline::apply`], fixed stage order |
//! | Negotiate + encode | [`format::negotiate`] then [`format::encode`] (JPEG q75, PNG lossless) |

mod error;
pub mod format;
pub mod pipeline;
mod request;

pub use error::ImagingError;
pub use format::{EncodedImage, OutputFormat, SUPPORTED_FORMATS, decode, encode, negotiate};
pub use pipeline::{Stage, apply, plan};
pub use request::TransformRequest;
