//! Core coordinators. Each receives its blob store and metadata index at
//! construction.

pub mod deletion;
pub mod index;
pub mod ingest;
pub mod retrieve;

pub use deletion::{DeleteError, DeletionCoordinator};
pub use index::{DbMetadataIndex, IndexError, InsertOutcome, MetadataIndex, NewImage};
pub use ingest::{IngestError, IngestOutcome, IngestionCoordinator, Upload};
pub use retrieve::{ResolvedImage, RetrievalCoordinator, RetrieveError};
