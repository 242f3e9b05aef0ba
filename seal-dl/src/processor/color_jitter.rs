//! Random photometric distortions.

use super::{random_symmetric, ImageTransform};
use crate::{common::*, utils::ImageExt};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdjustGammaInit {
    /// The bound of the log gamma shared by all channels.
    pub gamma: R64,
    /// The bound of the extra log gamma of each channel.
    pub channel_gamma: R64,
}

impl Default for AdjustGammaInit {
    fn default() -> Self {
        Self {
            gamma: r64(0.0),
            channel_gamma: r64(0.0),
        }
    }
}

impl AdjustGammaInit {
    pub fn build(self) -> Result<AdjustGamma> {
        let Self {
            gamma,
            channel_gamma,
        } = self;
        ensure!(gamma >= 0.0, "gamma must be non-negative");
        ensure!(channel_gamma >= 0.0, "channel_gamma must be non-negative");

        Ok(AdjustGamma {
            gamma: gamma.raw(),
            channel_gamma: channel_gamma.raw(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AdjustGamma {
    gamma: f64,
    channel_gamma: f64,
}

impl ImageTransform for AdjustGamma {
    fn forward_image(&self, image: &Tensor, rng: &mut StdRng) -> Result<Tensor> {
        let (channels, _height, _width) = image.size3()?;

        let gamma = random_symmetric(rng, self.gamma);
        let exponents: Vec<f32> = (0..channels)
            .map(|_| (gamma + random_symmetric(rng, self.channel_gamma)).exp() as f32)
            .collect();

        tch::no_grad(|| {
            let exponents = Tensor::of_slice(&exponents)
                .view([channels, 1, 1])
                .to_device(image.device());
            let output = (image.clamp_min(1e-8).log() * exponents)
                .exp()
                .clamp(0.0, 1.0);
            Ok(output)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdjustBrightnessInit {
    /// The bound of the additive brightness offset.
    pub brightness: R64,
    /// The bound of the contrast factor deviation from one.
    pub contrast: R64,
}

impl Default for AdjustBrightnessInit {
    fn default() -> Self {
        Self {
            brightness: r64(0.0),
            contrast: r64(0.0),
        }
    }
}

impl AdjustBrightnessInit {
    pub fn build(self) -> Result<AdjustBrightness> {
        let Self {
            brightness,
            contrast,
        } = self;
        ensure!(brightness >= 0.0, "brightness must be non-negative");
        ensure!(
            contrast >= 0.0 && contrast < 1.0,
            "contrast must be in range 0.0..1.0"
        );

        Ok(AdjustBrightness {
            brightness: brightness.raw(),
            contrast: contrast.raw(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AdjustBrightness {
    brightness: f64,
    contrast: f64,
}

impl ImageTransform for AdjustBrightness {
    fn forward_image(&self, image: &Tensor, rng: &mut StdRng) -> Result<Tensor> {
        let _ = image.size3()?;
        let offset = random_symmetric(rng, self.brightness);
        let factor = 1.0 + random_symmetric(rng, self.contrast);

        tch::no_grad(|| {
            let mean = image.mean(Kind::Float).double_value(&[]);
            let output = ((image - mean) * factor + mean + offset).clamp(0.0, 1.0);
            Ok(output)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdjustColoursInit {
    /// The bound of the hue rotation, in turns.
    pub hue: R64,
    /// The bound of the saturation factor deviation from one.
    pub saturation: R64,
}

impl Default for AdjustColoursInit {
    fn default() -> Self {
        Self {
            hue: r64(0.0),
            saturation: r64(0.0),
        }
    }
}

impl AdjustColoursInit {
    pub fn build(self) -> Result<AdjustColours> {
        let Self { hue, saturation } = self;
        ensure!(hue >= 0.0, "hue must be non-negative");
        ensure!(saturation >= 0.0, "saturation must be non-negative");

        Ok(AdjustColours {
            hue: hue.raw(),
            saturation: saturation.raw(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AdjustColours {
    hue: f64,
    saturation: f64,
}

impl ImageTransform for AdjustColours {
    fn forward_image(&self, rgb: &Tensor, rng: &mut StdRng) -> Result<Tensor> {
        if self.hue <= 0.0 && self.saturation <= 0.0 {
            return Ok(rgb.shallow_clone());
        }

        let hue_shift = random_symmetric(rng, self.hue);
        let saturation_factor = 1.0 + random_symmetric(rng, self.saturation);

        let hsv = rgb.f_rgb_to_hsv()?;
        let new_hsv = tch::no_grad(|| {
            let hue = hsv.select(0, 0) + hue_shift;
            let hue = &hue - hue.floor();
            let saturation = (hsv.select(0, 1) * saturation_factor).clamp(0.0, 1.0);
            let value = hsv.select(0, 2);
            Tensor::stack(&[hue, saturation, value], 0)
        });

        new_hsv.f_hsv_to_rgb()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_abs_diff(lhs: &Tensor, rhs: &Tensor) -> f64 {
        (lhs - rhs).abs().max().double_value(&[])
    }

    #[test]
    fn zero_parameters_are_identity() {
        let mut rng = StdRng::seed_from_u64(0);
        let image = Tensor::rand(&[3, 6, 6], (Kind::Float, Device::Cpu));

        let gamma = AdjustGammaInit::default().build().unwrap();
        let output = gamma.forward_image(&image, &mut rng).unwrap();
        assert!(max_abs_diff(&output, &image) < 1e-5);

        let brightness = AdjustBrightnessInit::default().build().unwrap();
        let output = brightness.forward_image(&image, &mut rng).unwrap();
        assert!(max_abs_diff(&output, &image) < 1e-5);

        let colours = AdjustColoursInit::default().build().unwrap();
        let output = colours.forward_image(&image, &mut rng).unwrap();
        assert!(max_abs_diff(&output, &image) < 1e-6);
    }

    #[test]
    fn outputs_stay_in_unit_range() {
        let image = Tensor::rand(&[3, 8, 8], (Kind::Float, Device::Cpu));
        let gamma = AdjustGammaInit {
            gamma: r64(0.5),
            channel_gamma: r64(0.2),
        }
        .build()
        .unwrap();
        let brightness = AdjustBrightnessInit {
            brightness: r64(0.3),
            contrast: r64(0.5),
        }
        .build()
        .unwrap();

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let output = gamma.forward_image(&image, &mut rng).unwrap();
            let output = brightness.forward_image(&output, &mut rng).unwrap();
            assert_eq!(output.size(), image.size());
            assert!(output.min().double_value(&[]) >= 0.0);
            assert!(output.max().double_value(&[]) <= 1.0);
        }
    }

    #[test]
    fn saturation_keeps_grey_pixels() {
        let mut rng = StdRng::seed_from_u64(1);
        let image = Tensor::ones(&[3, 4, 4], (Kind::Float, Device::Cpu)) * 0.5;
        let colours = AdjustColoursInit {
            hue: r64(0.0),
            saturation: r64(0.5),
        }
        .build()
        .unwrap();

        let output = colours.forward_image(&image, &mut rng).unwrap();
        assert!(max_abs_diff(&output, &image) < 1e-5);
    }

    #[test]
    fn invalid_parameters() {
        assert!(AdjustGammaInit {
            gamma: r64(-0.1),
            channel_gamma: r64(0.0),
        }
        .build()
        .is_err());
        assert!(AdjustBrightnessInit {
            brightness: r64(0.0),
            contrast: r64(1.0),
        }
        .build()
        .is_err());
    }
}
