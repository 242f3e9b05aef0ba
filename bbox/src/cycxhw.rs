use super::{Rect, TLBR};
use crate::common::*;

/// Bounding box in centre and size form.
///
/// Perturbations that act on the centre or the extent of a box are applied in
/// this form and converted back to [TLBR] afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CyCxHW<T> {
    pub(crate) cy: T,
    pub(crate) cx: T,
    pub(crate) h: T,
    pub(crate) w: T,
}

impl<T> CyCxHW<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Move the centre, keeping the size.
    pub fn shift(&self, dy: T, dx: T) -> Self {
        Self {
            cy: self.cy + dy,
            cx: self.cx + dx,
            ..*self
        }
    }

    /// Scale the extent about the centre.
    pub fn try_scale_hw(&self, scale_h: T, scale_w: T) -> Result<Self> {
        let zero = T::zero();
        ensure!(
            scale_h >= zero && scale_w >= zero,
            "scaling factor must be non-negative"
        );

        Ok(Self {
            h: self.h * scale_h,
            w: self.w * scale_w,
            ..*self
        })
    }
}

impl<T> Rect for CyCxHW<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.cy - self.h / two
    }

    fn l(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.cx - self.w / two
    }

    fn b(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.cy + self.h / two
    }

    fn r(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.cx + self.w / two
    }

    fn cy(&self) -> Self::Type {
        self.cy
    }

    fn cx(&self) -> Self::Type {
        self.cx
    }

    fn h(&self) -> Self::Type {
        self.h
    }

    fn w(&self) -> Self::Type {
        self.w
    }

    fn try_from_tlbr(tlbr: [T; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        let zero = T::zero();
        let two = T::one() + T::one();
        let h = b - t;
        let w = r - l;
        ensure!(
            h >= zero && w >= zero,
            "box height and width must be non-negative"
        );

        let cy = t + h / two;
        let cx = l + w / two;
        Ok(Self { cy, cx, h, w })
    }

    fn try_from_tlhw(tlhw: [T; 4]) -> Result<Self> {
        let [t, l, h, w] = tlhw;
        let zero = T::zero();
        let two = T::one() + T::one();
        ensure!(
            h >= zero && w >= zero,
            "box height and width must be non-negative"
        );

        let cy = t + h / two;
        let cx = l + w / two;
        Ok(Self { cy, cx, h, w })
    }

    fn try_from_cycxhw(cycxhw: [T; 4]) -> Result<Self> {
        let [cy, cx, h, w] = cycxhw;
        let zero = T::zero();
        ensure!(
            h >= zero && w >= zero,
            "box height and width must be non-negative"
        );

        Ok(Self { cy, cx, h, w })
    }
}

impl<T> From<&TLBR<T>> for CyCxHW<T>
where
    T: Copy + Num,
{
    fn from(from: &TLBR<T>) -> Self {
        let two = T::one() + T::one();
        let TLBR { t, l, b, r, .. } = *from;
        let h = b - t;
        let w = r - l;
        let cy = t + h / two;
        let cx = l + w / two;
        Self { cy, cx, h, w }
    }
}
