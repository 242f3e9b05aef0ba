//! Safe bounding box types and functions.
//!
//! Coordinates are stored in pixel units with the y axis first, following the
//! `t, l, b, r` convention. Conversions to and from the `x, y` ordered
//! `[xmin, ymin, xmax, ymax]` form are provided on [TLBR].

mod common;

pub use transform::*;
mod transform;

pub use rect::*;
pub mod rect;

pub use tlbr::*;
pub mod tlbr;

pub use cycxhw::*;
pub mod cycxhw;

pub use hw::*;
pub mod hw;

pub mod prelude {
    pub use crate::rect::{Rect, RectFloat, RectNum};
}
