use super::TLBR;
use crate::{common::*, HW};

/// Axis-aligned affine transform without rotation.
///
/// A point `(y, x)` maps to `(y * sy + ty, x * sx + tx)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn identity() -> Self {
        Self {
            sy: T::one(),
            sx: T::one(),
            ty: T::zero(),
            tx: T::zero(),
        }
    }

    /// Pure per-axis scaling about the origin.
    pub fn scale(sy: T, sx: T) -> Self {
        Self {
            sy,
            sx,
            ty: T::zero(),
            tx: T::zero(),
        }
    }

    /// Translate by `[ty, tx]` first, then scale by `[sy, sx]`.
    pub fn translate_scale(translate: [T; 2], scale: [T; 2]) -> Self {
        let [ty, tx] = translate;
        let [sy, sx] = scale;
        Self {
            sy,
            sx,
            ty: ty * sy,
            tx: tx * sx,
        }
    }

    pub fn from_sizes_exact(src_size: &HW<T>, tgt_size: &HW<T>) -> Self {
        Self::scale(
            tgt_size.h() / src_size.h(),
            tgt_size.w() / src_size.w(),
        )
    }
}

impl<T> Transform<T>
where
    T: Copy + Num + Neg<Output = T>,
{
    pub fn inverse(&self) -> Self {
        let sy = T::one() / self.sy;
        let sx = T::one() / self.sx;
        let ty = -self.ty / self.sy;
        let tx = -self.tx / self.sx;

        Self { sy, sx, ty, tx }
    }
}

impl<T> Mul<&TLBR<T>> for &Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    type Output = TLBR<T>;

    fn mul(self, rhs: &TLBR<T>) -> Self::Output {
        rhs.transform(self)
    }
}

impl<T> Mul<&Transform<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = Transform<T>;

    fn mul(self, rhs: &Transform<T>) -> Self::Output {
        Transform {
            sx: self.sx * rhs.sx,
            sy: self.sy * rhs.sy,
            tx: rhs.tx * self.sx + self.tx,
            ty: rhs.ty * self.sy + self.ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn rect_transform_inverse() {
        let orig = Transform {
            sx: 2.0,
            sy: 2.0,
            tx: 1.0,
            ty: 1.0,
        };
        assert_eq!(orig.inverse().inverse(), orig);
    }

    #[test]
    fn rect_resize_exact() {
        let transform = Transform::from_sizes_exact(
            &HW::from_hw([80.0, 80.0]),
            &HW::from_hw([20.0, 40.0]),
        );
        let expect = Transform {
            sx: 0.5,
            sy: 0.25,
            tx: 0.0,
            ty: 0.0,
        };
        assert_eq!(transform, expect);
    }

    #[test]
    fn rect_translate_then_scale() {
        let transform = Transform::translate_scale([-10.0, -20.0], [2.0, 0.5]);
        let bbox = TLBR::from_tlbr([10.0, 20.0, 12.0, 24.0]);
        assert_eq!((&transform * &bbox).tlbr(), [0.0, 0.0, 4.0, 2.0]);

        let composed = &transform.inverse() * &transform;
        assert_eq!(composed, Transform::identity());
    }
}
