use super::DetectionDataset;
use crate::{
    common::*,
    label::Instance,
    record::{Category, Target},
};
use rand_distr::StandardNormal;

/// The agreement between the noisy and the original train boxes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NoiseReport {
    pub total_iou: f64,
    pub num_instances: usize,
}

impl NoiseReport {
    /// The mean IoU, or `None` without train instances.
    pub fn mean_iou(&self) -> Option<f64> {
        (self.num_instances > 0).then(|| self.total_iou / self.num_instances as f64)
    }
}

impl DetectionDataset {
    /// Derive a dataset with perturbed boxes.
    ///
    /// Every box centre moves by `offset` times its size. Boxes of train
    /// images additionally get a centre shift of `N(0, 1) * noise` times their
    /// size, and their size is scaled by `|N(0, 1) * noise + 1|`.
    pub fn add_noise<R>(&self, noise: f64, offset: f64, rng: &mut R) -> Result<(Self, NoiseReport)>
    where
        R: Rng + ?Sized,
    {
        ensure!(noise >= 0.0, "noise must be non-negative");

        let mut perturb = |instance: &Instance, is_train: bool| -> Result<(Instance, Option<f64>)> {
            let orig = &instance.rect;
            let [h, w] = orig.hw();
            let mut extents = CyCxHW::from(orig).shift(offset * h, offset * w);

            if is_train {
                let dy = rng.sample::<f64, _>(StandardNormal) * noise * h;
                let dx = rng.sample::<f64, _>(StandardNormal) * noise * w;
                let scale_h = (rng.sample::<f64, _>(StandardNormal) * noise + 1.0).abs();
                let scale_w = (rng.sample::<f64, _>(StandardNormal) * noise + 1.0).abs();
                extents = extents.shift(dy, dx).try_scale_hw(scale_h, scale_w)?;
            }

            let rect = TLBR::from(&extents);
            let iou = is_train.then(|| rect.iou_with(orig, 1e-12));
            Ok((Label::new(rect, instance.class), iou))
        };

        let mut report = NoiseReport::default();
        let mut records = Vec::with_capacity(self.len());

        // visit images in id order so that a seeded generator reproduces
        for record in self.all_images() {
            let is_train = record.category == Category::Train;
            let mut instances = Vec::with_capacity(record.target.len());

            for instance in record.target.instances() {
                let (instance, iou) = perturb(instance, is_train)?;
                if let Some(iou) = iou {
                    report.total_iou += iou;
                    report.num_instances += 1;
                }
                instances.push(instance);
            }
            records.push(record.with_target(Target::new(instances)));
        }

        match report.mean_iou() {
            Some(mean_iou) => info!("added noise, mean iou = {}", mean_iou),
            None => info!("added noise, no train instances"),
        }

        let dataset = Self::from_records(records, self.classes().to_vec())?;
        Ok((dataset, report))
    }
}
