pub mod image_metadata;
