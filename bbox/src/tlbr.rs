use super::{CyCxHW, Rect};
use crate::{common::*, Transform};

/// Bounding box in TLBR format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Build from corners in `[xmin, ymin, xmax, ymax]` order.
    pub fn try_from_xyxy(xyxy: [T; 4]) -> Result<Self> {
        let [l, t, r, b] = xyxy;
        Self::try_from_tlbr([t, l, b, r])
    }

    /// Apply a scale-then-translate transform.
    ///
    /// The scaling factors must be positive so that the corner order is kept.
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        TLBR {
            t: self.t * transform.sy + transform.ty,
            l: self.l * transform.sx + transform.tx,
            b: self.b * transform.sy + transform.ty,
            r: self.r * transform.sx + transform.tx,
        }
    }

    /// Mirror along the vertical axis of an image with the given width.
    pub fn flip_horizontal(&self, width: T) -> Self {
        TLBR {
            t: self.t,
            l: width - self.r,
            b: self.b,
            r: width - self.l,
        }
    }

    /// Mirror along the horizontal axis of an image with the given height.
    pub fn flip_vertical(&self, height: T) -> Self {
        TLBR {
            t: height - self.b,
            l: self.l,
            b: height - self.t,
            r: self.r,
        }
    }

    /// Swap the x and y axes.
    pub fn transpose(&self) -> Self {
        TLBR {
            t: self.l,
            l: self.t,
            b: self.r,
            r: self.b,
        }
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn cy(&self) -> Self::Type {
        let one = T::one();
        let two = one + one;
        self.t + self.h() / two
    }

    fn cx(&self) -> Self::Type {
        let one = T::one();
        let two = one + one;
        self.l + self.w() / two
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_cycxhw(cycxhw: [Self::Type; 4]) -> Result<Self> {
        let [cy, cx, h, w] = cycxhw;
        let zero = T::zero();
        ensure!(h >= zero && w >= zero, "h and w must be non-negative");

        let two = T::one() + T::one();
        let t = cy - h / two;
        let b = cy + h / two;
        let l = cx - w / two;
        let r = cx + w / two;

        Ok(Self { t, l, b, r })
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self> {
        let [t, l, h, w] = tlhw;
        let b = t + h;
        let r = l + w;
        Self::try_from_tlbr([t, l, b, r])
    }
}

impl<T> From<&CyCxHW<T>> for TLBR<T>
where
    T: Copy + Num,
{
    fn from(from: &CyCxHW<T>) -> Self {
        let two = T::one() + T::one();
        let CyCxHW { cy, cx, h, w, .. } = *from;
        let t = cy - h / two;
        let l = cx - w / two;
        let b = cy + h / two;
        let r = cx + w / two;
        Self { t, l, b, r }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn tlbr_xyxy_order() {
        let bbox = TLBR::try_from_xyxy([1.0, 2.0, 5.0, 4.0]).unwrap();
        assert_eq!(bbox.tlbr(), [2.0, 1.0, 4.0, 5.0]);
        assert_eq!(bbox.xyxy(), [1.0, 2.0, 5.0, 4.0]);
        assert!(TLBR::try_from_xyxy([5.0, 2.0, 1.0, 4.0]).is_err());
    }

    #[test]
    fn tlbr_flips() {
        let bbox = TLBR::from_tlbr([1.0, 2.0, 3.0, 6.0]);
        assert_eq!(bbox.flip_horizontal(10.0).tlbr(), [1.0, 4.0, 3.0, 8.0]);
        assert_eq!(bbox.flip_vertical(10.0).tlbr(), [7.0, 2.0, 9.0, 6.0]);
        assert_eq!(bbox.transpose().tlbr(), [2.0, 1.0, 6.0, 3.0]);
        assert_eq!(bbox.flip_horizontal(10.0).flip_horizontal(10.0), bbox);
        assert_eq!(bbox.transpose().transpose(), bbox);
    }
}
