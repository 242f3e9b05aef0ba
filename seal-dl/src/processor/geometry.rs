//! Resizing, flipping and box filtering.

use super::Transform;
use crate::{common::*, record::Sample, utils::ImageExt};

/// Uniformly rescale the image and its boxes.
#[derive(Debug, Clone)]
pub struct Scale {
    factor: f64,
}

impl Scale {
    pub fn new(factor: f64) -> Result<Self> {
        ensure!(factor > 0.0, "scale factor must be positive");
        Ok(Self { factor })
    }
}

impl Transform for Scale {
    type Output = Sample;

    fn forward(&self, sample: &Sample, _rng: &mut StdRng) -> Result<Sample> {
        scale_sample(sample, self.factor)
    }
}

/// Rescale so that the smaller image side reaches `size`, keeping the aspect
/// ratio.
#[derive(Debug, Clone)]
pub struct Resize {
    size: usize,
}

impl Resize {
    pub fn new(size: usize) -> Result<Self> {
        ensure!(size > 0, "resize size must be positive");
        Ok(Self { size })
    }
}

impl Transform for Resize {
    type Output = Sample;

    fn forward(&self, sample: &Sample, _rng: &mut StdRng) -> Result<Sample> {
        let [height, width] = sample.hw()?.hw();
        let size = self.size as f64;
        let factor = (size / height as f64).max(size / width as f64);
        scale_sample(sample, factor)
    }
}

fn scale_sample(sample: &Sample, factor: f64) -> Result<Sample> {
    let image = sample.image.f_resize_scale(factor)?;
    let target = sample.target.transform(&RectTransform::scale(factor, factor));
    Ok(sample.shallow_clone().with_image(image).with_target(target))
}

/// Resize to an exact output size. The aspect ratio is not kept.
#[derive(Debug, Clone)]
pub struct ResizeTo {
    size: HW<i64>,
}

impl ResizeTo {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "output size must be positive, but get {}x{}",
            width,
            height
        );
        Ok(Self {
            size: HW::from_hw([height as i64, width as i64]),
        })
    }
}

impl Transform for ResizeTo {
    type Output = Sample;

    fn forward(&self, sample: &Sample, _rng: &mut StdRng) -> Result<Sample> {
        let orig_size = sample.hw()?.cast::<f64>();
        let [new_h, new_w] = self.size.hw();
        let image = sample.image.f_resize_to(new_h, new_w)?;
        let transform = RectTransform::from_sizes_exact(&orig_size, &self.size.cast::<f64>());
        let target = sample.target.transform(&transform);
        Ok(sample.shallow_clone().with_image(image).with_target(target))
    }
}

/// Random transpose, vertical and horizontal flips, each with 50%
/// probability when enabled.
#[derive(Debug, Clone, Default)]
pub struct RandomFlips {
    pub horizontal: bool,
    pub vertical: bool,
    pub transposes: bool,
}

impl Transform for RandomFlips {
    type Output = Sample;

    fn forward(&self, sample: &Sample, rng: &mut StdRng) -> Result<Sample> {
        let Self {
            horizontal,
            vertical,
            transposes,
        } = *self;
        let mut image = sample.image.shallow_clone();
        let mut target = sample.target.clone();

        if transposes && rng.gen_bool(0.5) {
            image = image.f_transpose_hw()?;
            target = target.map_boxes(|rect| rect.transpose());
        }

        if vertical && rng.gen_bool(0.5) {
            let height = image.f_image_hw()?.h() as f64;
            image = image.f_flip_vertical()?;
            target = target.map_boxes(|rect| rect.flip_vertical(height));
        }

        if horizontal && rng.gen_bool(0.5) {
            let width = image.f_image_hw()?.w() as f64;
            image = image.f_flip_horizontal()?;
            target = target.map_boxes(|rect| rect.flip_horizontal(width));
        }

        Ok(sample.shallow_clone().with_image(image).with_target(target))
    }
}

/// Drops instances whose visible fraction inside the image falls below
/// `min_visible`.
#[derive(Debug, Clone)]
pub struct FilterBoxes {
    min_visible: f64,
}

impl FilterBoxes {
    pub fn new(min_visible: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&min_visible),
            "min_visible must be in range 0.0..=1.0"
        );
        Ok(Self { min_visible })
    }
}

impl Transform for FilterBoxes {
    type Output = Sample;

    fn forward(&self, sample: &Sample, _rng: &mut StdRng) -> Result<Sample> {
        let [height, width] = sample.hw()?.cast::<f64>().hw();
        let bounds = TLBR::from_tlhw([0.0, 0.0, height, width]);
        let orig_len = sample.target.len();

        let target = sample
            .target
            .retain(|instance| instance.rect.visible_fraction_in(&bounds) >= self.min_visible);

        if target.len() < orig_len {
            debug!(
                "{}: dropped {} hidden instances",
                sample.id,
                orig_len - target.len()
            );
        }

        Ok(sample.shallow_clone().with_target(target))
    }
}
