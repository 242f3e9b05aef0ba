use super::TLBR;
use crate::common::*;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_cycxhw(cycxhw: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd,
{
    fn from_tlbr(tlbr: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlbr(tlbr).unwrap()
    }

    fn from_tlhw(tlhw: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlhw(tlhw).unwrap()
    }

    fn from_cycxhw(cycxhw: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_cycxhw(cycxhw).unwrap()
    }

    fn cycxhw(&self) -> [Self::Type; 4] {
        [self.cy(), self.cx(), self.h(), self.w()]
    }

    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    /// Corners in `[xmin, ymin, xmax, ymax]` order.
    fn xyxy(&self) -> [Self::Type; 4] {
        [self.l(), self.t(), self.r(), self.b()]
    }

    fn tlhw(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.h(), self.w()]
    }

    fn hw(&self) -> [Self::Type; 2] {
        [self.h(), self.w()]
    }

    fn to_tlbr(&self) -> TLBR<Self::Type> {
        TLBR {
            t: self.t(),
            l: self.l(),
            b: self.b(),
            r: self.r(),
        }
    }

    fn area(&self) -> <Self::Type as Mul<Self::Type>>::Output
    where
        Self::Type: Mul<Self::Type>,
    {
        self.h() * self.w()
    }

    fn contains_point(&self, y: Self::Type, x: Self::Type) -> bool {
        y >= self.t() && y <= self.b() && x >= self.l() && x <= self.r()
    }
}

pub trait RectFloat: RectNum
where
    Self::Type: Float,
{
    fn intersect_with<R>(&self, other: &R) -> Option<TLBR<Self::Type>>
    where
        R: Rect<Type = Self::Type>,
    {
        let t = self.t().max(other.t());
        let l = self.l().max(other.l());
        let b = self.b().min(other.b());
        let r = self.r().min(other.r());
        (b > t && r > l).then(|| TLBR { t, l, b, r })
    }

    fn intersection_area_with<R>(&self, other: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        self.intersect_with(other)
            .map(|rect| rect.area())
            .unwrap_or_else(Self::Type::zero)
    }

    fn iou_with<R>(&self, other: &R, epsilon: Self::Type) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        let inter_area = self.intersection_area_with(other);
        let union_area = self.area() + other.area() - inter_area + epsilon;
        inter_area / union_area
    }

    /// Fraction of this rectangle's area lying inside `region`.
    ///
    /// A degenerate rectangle counts as fully visible when its centre lies in
    /// the region and hidden otherwise.
    fn visible_fraction_in<R>(&self, region: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        let area = self.area();

        if area <= Self::Type::zero() {
            let region = region.to_tlbr();
            return if region.contains_point(self.cy(), self.cx()) {
                Self::Type::one()
            } else {
                Self::Type::zero()
            };
        }

        self.intersection_area_with(region) / area
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd,
{
}

impl<T> RectFloat for T
where
    T: Rect,
    T::Type: Float,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rect_iou() {
        let lhs = TLBR::from_tlbr([0.0, 0.0, 2.0, 2.0]);
        let rhs = TLBR::from_tlbr([1.0, 0.0, 3.0, 2.0]);
        assert_abs_diff_eq!(lhs.iou_with(&lhs, 0.0), 1.0);
        assert_abs_diff_eq!(lhs.iou_with(&rhs, 0.0), 2.0 / 6.0);

        let far = TLBR::from_tlbr([10.0, 10.0, 11.0, 11.0]);
        assert_abs_diff_eq!(lhs.iou_with(&far, 0.0), 0.0);
    }

    #[test]
    fn rect_visible_fraction() {
        let region = TLBR::from_tlhw([0.0, 0.0, 10.0, 10.0]);

        let inside = TLBR::from_tlbr([2.0, 2.0, 4.0, 4.0]);
        assert_abs_diff_eq!(inside.visible_fraction_in(&region), 1.0);

        let half = TLBR::from_tlbr([8.0, 2.0, 12.0, 4.0]);
        assert_abs_diff_eq!(half.visible_fraction_in(&region), 0.5);

        let outside = TLBR::from_tlbr([20.0, 20.0, 22.0, 22.0]);
        assert_abs_diff_eq!(outside.visible_fraction_in(&region), 0.0);

        let point = TLBR::from_tlbr([5.0, 5.0, 5.0, 5.0]);
        assert_abs_diff_eq!(point.visible_fraction_in(&region), 1.0);
    }
}
