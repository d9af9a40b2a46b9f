mod error;
mod hash;
mod key;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod object;

pub use error::StorageError;
pub use hash::ContentHash;
pub use key::BlobKey;
pub use traits::BlobStore;
