//! Sample transforms and the pipelines built from them.

pub mod color_jitter;
pub mod encode;
pub mod geometry;
pub mod pipeline;
pub mod random_crop;
pub mod transform;

pub use color_jitter::*;
pub use encode::*;
pub use geometry::*;
pub use pipeline::*;
pub use random_crop::*;
pub use transform::*;
