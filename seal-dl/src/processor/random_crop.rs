//! Random scale, aspect and placement cropping with zero padding.

use super::{random_log, Transform};
use crate::{common::*, record::Sample, utils::ImageExt};

#[derive(Debug, Clone)]
pub struct RandomCropPaddedInit {
    /// The output image size.
    pub dest_size: HW<usize>,
    /// The range of the zoom factor, drawn in log space.
    pub scale_range: (R64, R64),
    /// The range of the width to height stretch, drawn in log space.
    pub aspect_range: (R64, R64),
    /// The fraction of the window size allowed to hang over the image border.
    pub border_bias: R64,
    /// The probability to place the window around a random instance.
    pub select_instance: R64,
}

impl RandomCropPaddedInit {
    pub fn build(self) -> Result<RandomCropPadded> {
        let Self {
            dest_size,
            scale_range: (min_scale, max_scale),
            aspect_range: (min_aspect, max_aspect),
            border_bias,
            select_instance,
        } = self;

        ensure!(
            dest_size.h() > 0 && dest_size.w() > 0,
            "dest_size must be positive"
        );
        ensure!(
            min_scale > 0.0 && min_scale <= max_scale,
            "invalid scale range ({}, {})",
            min_scale,
            max_scale
        );
        ensure!(
            min_aspect > 0.0 && min_aspect <= max_aspect,
            "invalid aspect range ({}, {})",
            min_aspect,
            max_aspect
        );
        ensure!(border_bias >= 0.0, "border_bias must be non-negative");
        ensure!(
            (0.0..=1.0).contains(&select_instance.raw()),
            "select_instance must be in range 0.0..=1.0"
        );

        Ok(RandomCropPadded {
            dest_size: dest_size.cast(),
            scale_range: (min_scale.raw(), max_scale.raw()),
            aspect_range: (min_aspect.raw(), max_aspect.raw()),
            border_bias: border_bias.raw(),
            select_instance: select_instance.raw(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RandomCropPadded {
    dest_size: HW<i64>,
    scale_range: (f64, f64),
    aspect_range: (f64, f64),
    border_bias: f64,
    select_instance: f64,
}

impl RandomCropPadded {
    pub fn dest_size(&self) -> HW<i64> {
        self.dest_size
    }
}

impl Transform for RandomCropPadded {
    type Output = Sample;

    fn forward(&self, sample: &Sample, rng: &mut StdRng) -> Result<Sample> {
        let image_size = sample.hw()?.cast::<f64>();
        let [dest_h, dest_w] = self.dest_size.cast::<f64>().hw();

        let scale = random_log(rng, self.scale_range.0, self.scale_range.1);
        let aspect = random_log(rng, self.aspect_range.0, self.aspect_range.1);
        let sx = scale * aspect.sqrt();
        let sy = scale / aspect.sqrt();
        let region = HW::from_hw([dest_h / sy, dest_w / sx]);

        let instance = if self.select_instance > 0.0 && rng.gen_bool(self.select_instance) {
            sample.target.instances().choose(rng)
        } else {
            None
        };

        let [top, left] = match instance {
            Some(instance) => random_crop_target(rng, &image_size, &region, &instance.rect),
            None => random_crop_padded(rng, &image_size, &region, self.border_bias),
        };

        let transform = RectTransform::translate_scale([-top, -left], [sy, sx]);
        let image = sample.image.f_warp_affine(&transform, &self.dest_size)?;
        let target = sample.target.transform(&transform);

        Ok(sample.shallow_clone().with_image(image).with_target(target))
    }
}

/// Draw the top-left corner of a window of size `region` inside an image.
///
/// The window may hang over each border by up to `border_bias` of its own
/// size. A window larger than the image always covers it along that axis.
pub fn random_crop_padded<R>(
    rng: &mut R,
    image_size: &HW<f64>,
    region: &HW<f64>,
    border_bias: f64,
) -> [f64; 2]
where
    R: Rng + ?Sized,
{
    let top = padded_start(rng, image_size.h(), region.h(), border_bias);
    let left = padded_start(rng, image_size.w(), region.w(), border_bias);
    [top, left]
}

/// Draw the top-left corner of a window of size `region` containing `rect`.
///
/// The window stays inside the image where possible. When the box is larger
/// than the window, the window is centred on the box.
pub fn random_crop_target<R>(
    rng: &mut R,
    image_size: &HW<f64>,
    region: &HW<f64>,
    rect: &TLBR<f64>,
) -> [f64; 2]
where
    R: Rng + ?Sized,
{
    let top = target_start(rng, image_size.h(), region.h(), rect.t(), rect.b());
    let left = target_start(rng, image_size.w(), region.w(), rect.l(), rect.r());
    [top, left]
}

fn padded_start<R>(rng: &mut R, length: f64, region: f64, border_bias: f64) -> f64
where
    R: Rng + ?Sized,
{
    if region > length {
        rng.gen_range((length - region)..=0.0)
    } else {
        let margin = border_bias * region;
        rng.gen_range((-margin)..=(length - region + margin))
    }
}

fn target_start<R>(rng: &mut R, length: f64, region: f64, lo: f64, hi: f64) -> f64
where
    R: Rng + ?Sized,
{
    let lower = (hi - region).max((length - region).min(0.0));
    let upper = lo.min((length - region).max(0.0));

    if lower > upper {
        (lo + hi - region) / 2.0
    } else {
        rng.gen_range(lower..=upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Target;

    fn init(dest: usize, scale: (f64, f64), select_instance: f64) -> RandomCropPaddedInit {
        RandomCropPaddedInit {
            dest_size: HW::from_hw([dest, dest]),
            scale_range: (r64(scale.0), r64(scale.1)),
            aspect_range: (r64(1.0), r64(1.0)),
            border_bias: r64(0.1),
            select_instance: r64(select_instance),
        }
    }

    fn sample(bbox: &[[f64; 4]]) -> Sample {
        let labels = vec![0; bbox.len()];
        let target = Target::from_parts(bbox, &labels).unwrap();
        let image = Tensor::rand(&[3, 60, 80], (Kind::Float, Device::Cpu));
        Sample::new("crop", image, target).unwrap()
    }

    #[test]
    fn unit_ranges_keep_box_size() {
        let crop = init(32, (1.0, 1.0), 0.5).build().unwrap();
        let input = sample(&[[10.0, 10.0, 20.0, 15.0], [40.0, 30.0, 70.0, 58.0]]);

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let output = crop.forward(&input, &mut rng).unwrap();
            assert_eq!(output.hw().unwrap().hw(), [32, 32]);
            assert_eq!(output.target.label(), input.target.label());

            izip!(output.target.instances(), input.target.instances()).for_each(
                |(lhs, rhs)| {
                    assert_abs_diff_eq!(lhs.rect.h(), rhs.rect.h(), epsilon = 1e-9);
                    assert_abs_diff_eq!(lhs.rect.w(), rhs.rect.w(), epsilon = 1e-9);
                },
            );
        }
    }

    #[test]
    fn selected_instance_lies_inside_window() {
        let crop = init(32, (1.0, 1.0), 1.0).build().unwrap();
        let input = sample(&[[50.0, 40.0, 58.0, 52.0]]);

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let output = crop.forward(&input, &mut rng).unwrap();
            let rect = &output.target.instances()[0].rect;
            assert!(rect.t() >= -1e-9 && rect.l() >= -1e-9);
            assert!(rect.b() <= 32.0 + 1e-9 && rect.r() <= 32.0 + 1e-9);
        }
    }

    #[test]
    fn empty_target_falls_back_to_random_placement() {
        let crop = init(32, (0.8, 1.25), 1.0).build().unwrap();
        let input = sample(&[]);

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let output = crop.forward(&input, &mut rng).unwrap();
            assert_eq!(output.hw().unwrap().hw(), [32, 32]);
            assert!(output.target.is_empty());
        }
    }

    #[test]
    fn seeded_crop_is_reproducible() {
        let crop = init(24, (0.5, 2.0), 0.5).build().unwrap();
        let input = sample(&[[10.0, 10.0, 20.0, 15.0]]);

        let lhs = crop
            .forward(&input, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let rhs = crop
            .forward(&input, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(lhs.target, rhs.target);
        assert!(lhs.image.equal(&rhs.image));
    }

    #[test]
    fn placement_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        let image_size = HW::from_hw([100.0, 50.0]);

        for _ in 0..100 {
            let region = HW::from_hw([20.0, 80.0]);
            let [top, left] = random_crop_padded(&mut rng, &image_size, &region, 0.1);
            assert!((-2.0..=82.0).contains(&top));
            assert!((-30.0..=0.0).contains(&left));

            let rect = TLBR::from_tlbr([30.0, 10.0, 40.0, 20.0]);
            let [top, left] = random_crop_target(&mut rng, &image_size, &region, &rect);
            assert!(top <= 30.0 && top + 20.0 >= 40.0);
            assert!(left <= 10.0 && left + 80.0 >= 20.0);
        }

        // a box taller than the window centres the window on it
        let region = HW::from_hw([10.0, 10.0]);
        let rect = TLBR::from_tlbr([20.0, 20.0, 40.0, 25.0]);
        let [top, _left] = random_crop_target(&mut rng, &image_size, &region, &rect);
        assert_abs_diff_eq!(top, 25.0);
    }

    #[test]
    fn invalid_parameters() {
        assert!(init(32, (2.0, 1.0), 0.5).build().is_err());
        assert!(init(32, (0.0, 1.0), 0.5).build().is_err());
        assert!(init(32, (1.0, 1.0), 1.5).build().is_err());
        assert!(init(0, (1.0, 1.0), 0.5).build().is_err());
    }
}
