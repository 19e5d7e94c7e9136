pub mod image_pipeline;
pub mod object_storage;

pub use image_pipeline::ImagePipeline;
pub use object_storage::ObjectStorage;
