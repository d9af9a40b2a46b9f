use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("failed to decode {format} image: {reason}")]
    Decode { format: String, reason: String },

    #[error("unsupported image format: {format}, use one of the following formats: {supported}")]
    UnsupportedFormat { format: String, supported: String },

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}
