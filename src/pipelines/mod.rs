//! # Pipelines Module
//!
//! High-level workflow orchestration: wire files to the model layer and
//! back. Decoding fans independent traces out across the rayon pool; each
//! trace stays a single-threaded inference call with its own seed.

pub mod decode;
pub mod train;

pub use decode::DecodePipeline;
pub use train::TrainPipeline;
