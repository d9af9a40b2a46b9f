use std::fmt;
use std::str::FromStr;

use super::error::StorageError;
use super::hash::ContentHash;

const MAX_EXTENSION_LEN: usize = 10;

/// Storage key of a blob: content digest plus the original file extension.
///
/// Rendered as `"{hex}.{ext}"`, which is also the `filename` persisted in the
/// metadata index. Identical bytes uploaded under the same extension always
/// map to the same key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
    hash: ContentHash,
    extension: String,
}

impl BlobKey {
    /// Build a key from a digest and an extension (leading dot optional,
    /// normalised to lowercase).
    pub fn new(hash: ContentHash, extension: &str) -> Result<Self, StorageError> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        validate_extension(&extension)?;
        Ok(Self { hash, extension })
    }

    /// Hash `data` and key it under `extension`.
    pub fn for_content(data: &[u8], extension: &str) -> Result<Self, StorageError> {
        Self::new(ContentHash::compute(data), extension)
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Extension without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

fn validate_extension(ext: &str) -> Result<(), StorageError> {
    if ext.is_empty() {
        return Err(StorageError::InvalidKey("missing extension".into()));
    }
    if ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StorageError::InvalidKey(format!("invalid extension: {ext}")));
    }
    Ok(())
}

impl FromStr for BlobKey {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hex, ext) = s
            .split_once('.')
            .ok_or_else(|| StorageError::InvalidKey(format!("no extension in key: {s}")))?;
        Self::new(ContentHash::from_hex(hex)?, ext)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.hash, self.extension)
    }
}

impl fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobKey({self})")
    }
}
