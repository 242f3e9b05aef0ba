//! Data pipeline of the seal detector.
//!
//! The crate turns annotated aerial images into augmented, encoder-ready
//! batches. [dataset::DetectionDataset] owns the annotated images and builds
//! [loader::DataLoader]s that combine [processor] transforms, a
//! [sampler::Sampler] and [collate::Collate] into batch streams.

mod common;
pub mod collate;
pub mod config;
pub mod dataset;
pub mod label;
pub mod loader;
pub mod processor;
pub mod profiling;
pub mod record;
pub mod sampler;
pub mod utils;
