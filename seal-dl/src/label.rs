use crate::common::*;

/// A labeled box in pixel units of the image it belongs to.
pub type Instance = Label<TLBR<f64>, usize>;
