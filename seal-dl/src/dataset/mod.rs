//! The annotated image collection and its data loaders.

mod detection;
mod error;
mod file;
mod noise;

pub use detection::*;
pub use error::*;
pub use noise::*;
