//! Class-labeled rectangles.

use bbox::{Rect, Transform, TLBR};
use num_traits::Num;
use std::ops::Mul;

/// A rectangle tagged with a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}

impl<R, C> Label<R, C>
where
    R: Rect,
{
    pub fn new(rect: R, class: C) -> Self {
        Self { rect, class }
    }
}

impl<'a, T, C> Mul<&'a Label<TLBR<T>, C>> for &'a Transform<T>
where
    T: Copy + Num + PartialOrd,
    C: Copy,
{
    type Output = Label<TLBR<T>, C>;

    fn mul(self, rhs: &'a Label<TLBR<T>, C>) -> Self::Output {
        Label {
            rect: self * &rhs.rect,
            class: rhs.class,
        }
    }
}
