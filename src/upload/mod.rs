pub mod chunk;
pub mod hash;
pub mod orchestrator;

pub use chunk::ChunkStatus;
pub use orchestrator::ChunkUploader;
