//! The training and testing pipelines built from the augmentation options.

use super::{
    AdjustBrightnessInit, AdjustColoursInit, AdjustGammaInit, Compose, Encoder, FilterBoxes,
    Identity, Multiple, OnImage, Pipeline, RandomCropPaddedInit, RandomFlips, Resize, ResizeTo,
    Scale,
};
use crate::{
    common::*,
    config::{AugmentConfig, AugmentKind},
};

/// Build the randomized training pipeline producing `image_samples` encoded
/// samples per image.
///
/// The encoder is moved to CPU since samples are produced by CPU workers.
pub fn transform_training<E>(
    config: &AugmentConfig,
    image_samples: usize,
    encoder: &E,
) -> Result<Multiple<Pipeline<E>>>
where
    E: Encoder,
{
    config.validate()?;
    let dest_size = config.dest_size();
    ensure!(dest_size > 0, "the output image size must be positive");

    let scale = config.scale;
    let transform = match config.augment {
        AugmentKind::Crop => Compose::new().then(
            RandomCropPaddedInit {
                dest_size: HW::from_hw([dest_size, dest_size]),
                scale_range: (scale * config.min_scale(), scale * config.max_scale),
                aspect_range: (r64(1.0) / config.max_aspect, config.max_aspect),
                border_bias: config.border_bias,
                select_instance: config.select_instance,
            }
            .build()?,
        ),
        AugmentKind::Resize => Compose::new().then(ResizeTo::new(dest_size, dest_size)?),
    };

    let adjust_light = OnImage::new()
        .then(
            AdjustGammaInit {
                gamma: config.gamma,
                channel_gamma: config.channel_gamma,
            }
            .build()?,
        )
        .then(
            AdjustBrightnessInit {
                brightness: config.brightness,
                contrast: config.contrast,
            }
            .build()?,
        )
        .then(
            AdjustColoursInit {
                hue: config.hue,
                saturation: config.saturation,
            }
            .build()?,
        );

    let transform = transform
        .then(adjust_light)
        .then(FilterBoxes::new(config.min_visible.raw())?)
        .then(RandomFlips {
            horizontal: config.flips,
            vertical: config.vertical_flips,
            transposes: config.transposes,
        });

    let encoder = encoder.to_device(Device::Cpu);
    Multiple::new(image_samples, Pipeline::new(transform, encoder))
}

/// Build the deterministic testing pipeline.
pub fn transform_testing<E>(config: &AugmentConfig, encoder: &E) -> Result<Pipeline<E>>
where
    E: Encoder,
{
    config.validate()?;

    let transform = match config.augment {
        AugmentKind::Crop => match config.resize {
            Some(size) => Compose::new().then(Resize::new(size)?),
            None if config.scale != 1.0 => Compose::new().then(Scale::new(config.scale.raw())?),
            None => Compose::new().then(Identity),
        },
        AugmentKind::Resize => {
            let dest_size = config.dest_size();
            Compose::new().then(ResizeTo::new(dest_size, dest_size)?)
        }
    };

    Ok(Pipeline::new(transform, encoder.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        processor::{NullEncoder, Transform},
        record::{Sample, Target},
    };

    fn sample() -> Sample {
        let target = Target::from_parts(
            &[[10.0, 12.0, 30.0, 28.0], [50.0, 40.0, 60.0, 55.0]],
            &[0, 1],
        )
        .unwrap();
        let image = Tensor::rand(&[3, 60, 80], (Kind::Float, Device::Cpu));
        Sample::new("pipeline", image, target).unwrap()
    }

    #[test]
    fn training_yields_image_samples() {
        let config = AugmentConfig {
            image_size: 32,
            transposes: true,
            vertical_flips: true,
            hue: r64(0.05),
            saturation: r64(0.1),
            ..Default::default()
        };
        let pipeline = transform_training(&config, 3, &NullEncoder).unwrap();
        assert_eq!(pipeline.count(), 3);

        let mut rng = StdRng::seed_from_u64(0);
        let outputs = pipeline.forward(&sample(), &mut rng).unwrap();
        assert_eq!(outputs.len(), 3);

        for output in outputs {
            assert_eq!(output.image.size(), vec![3, 32, 32]);
            assert_eq!(output.lengths, output.target.len());
            assert_eq!(output.id, "pipeline");
        }
    }

    #[test]
    fn resize_augment_is_exact() {
        let config = AugmentConfig {
            augment: AugmentKind::Resize,
            image_size: 40,
            scale: r64(0.5),
            flips: false,
            ..Default::default()
        };

        let mut rng = StdRng::seed_from_u64(1);
        let training = transform_training(&config, 1, &NullEncoder).unwrap();
        let outputs = training.forward(&sample(), &mut rng).unwrap();
        assert_eq!(outputs[0].image.size(), vec![3, 20, 20]);

        let testing = transform_testing(&config, &NullEncoder).unwrap();
        let output = testing.forward(&sample(), &mut rng).unwrap();
        assert_eq!(output.image.size(), vec![3, 20, 20]);
        izip!(&output.target.bbox()[0], &[2.5, 4.0, 7.5, 28.0 / 3.0])
            .for_each(|(&lhs, &rhs)| assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-9));
    }

    #[test]
    fn testing_crop_variants() {
        let mut rng = StdRng::seed_from_u64(2);
        let input = sample();

        let identity = transform_testing(&AugmentConfig::default(), &NullEncoder).unwrap();
        let output = identity.forward(&input, &mut rng).unwrap();
        assert_eq!(output.image.size(), vec![3, 60, 80]);
        assert_eq!(output.target, input.target);

        let config = AugmentConfig {
            scale: r64(0.5),
            ..Default::default()
        };
        let scaled = transform_testing(&config, &NullEncoder).unwrap();
        let output = scaled.forward(&input, &mut rng).unwrap();
        assert_eq!(output.image.size(), vec![3, 30, 40]);

        let config = AugmentConfig {
            resize: Some(120),
            scale: r64(0.5),
            ..Default::default()
        };
        let resized = transform_testing(&config, &NullEncoder).unwrap();
        let output = resized.forward(&input, &mut rng).unwrap();
        assert_eq!(output.image.size(), vec![3, 120, 160]);
    }
}
