//! Data pipeline configuration format.

use crate::common::*;

/// The data pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub augment: AugmentConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Self = json5::from_str(&text)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        config.augment.validate()?;
        Ok(config)
    }
}

/// Sampling and batching options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// The number of training samples per epoch, counted after each image is
    /// expanded into `image_samples` samples. One shuffled pass when unset.
    pub epoch_size: Option<NonZeroUsize>,
    /// The number of augmented samples drawn from each loaded image.
    pub image_samples: NonZeroUsize,
    /// The number of samples per training batch.
    pub batch_size: NonZeroUsize,
    /// The number of loading workers. Defaults to the number of CPUs.
    pub num_workers: Option<usize>,
    /// The seed of the sampling and augmentation randomness.
    pub seed: Option<u64>,
}

impl LoaderConfig {
    pub fn num_workers(&self) -> usize {
        self.num_workers
            .filter(|&count| count > 0)
            .unwrap_or_else(num_cpus::get)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            epoch_size: None,
            image_samples: NonZeroUsize::new(1).unwrap(),
            batch_size: NonZeroUsize::new(8).unwrap(),
            num_workers: None,
            seed: None,
        }
    }
}

/// The geometric augmentation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AugmentKind {
    /// Random scale, aspect and placement crop.
    Crop,
    /// Plain resize to the output size.
    Resize,
}

/// Augmentation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    pub augment: AugmentKind,
    /// The global zoom factor applied to all images.
    pub scale: R64,
    /// The side length of training images before `scale` applies.
    pub image_size: usize,
    /// The minimum random zoom. Defaults to the reciprocal of `max_scale`.
    pub min_scale: Option<R64>,
    pub max_scale: R64,
    pub max_aspect: R64,
    pub border_bias: R64,
    /// The probability to crop around a random instance.
    pub select_instance: R64,
    /// The minimum visible fraction of a box to keep it after cropping.
    pub min_visible: R64,
    pub flips: bool,
    pub vertical_flips: bool,
    pub transposes: bool,
    pub gamma: R64,
    pub channel_gamma: R64,
    pub brightness: R64,
    pub contrast: R64,
    pub hue: R64,
    pub saturation: R64,
    /// Resize testing images so the smaller side reaches this size.
    pub resize: Option<usize>,
}

impl AugmentConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.scale > 0.0, "scale must be positive");
        ensure!(self.image_size > 0, "image_size must be positive");
        ensure!(self.max_scale > 0.0, "max_scale must be positive");
        ensure!(self.max_aspect >= 1.0, "max_aspect must be at least 1");
        if let Some(min_scale) = self.min_scale {
            ensure!(
                min_scale > 0.0 && min_scale <= self.max_scale,
                "min_scale must be in range (0, max_scale]"
            );
        }
        ensure!(
            (0.0..=1.0).contains(&self.select_instance.raw()),
            "select_instance must be in range 0.0..=1.0"
        );
        ensure!(
            (0.0..=1.0).contains(&self.min_visible.raw()),
            "min_visible must be in range 0.0..=1.0"
        );
        if let Some(resize) = self.resize {
            ensure!(resize > 0, "resize must be positive");
        }
        Ok(())
    }

    /// The side length of the square output images.
    pub fn dest_size(&self) -> usize {
        (self.image_size as f64 * self.scale.raw()) as usize
    }

    /// The minimum random zoom after defaults are applied.
    pub fn min_scale(&self) -> R64 {
        self.min_scale.unwrap_or_else(|| r64(1.0) / self.max_scale)
    }
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            augment: AugmentKind::Crop,
            scale: r64(1.0),
            image_size: 440,
            min_scale: None,
            max_scale: r64(1.25),
            max_aspect: r64(1.1),
            border_bias: r64(0.1),
            select_instance: r64(0.5),
            min_visible: r64(0.4),
            flips: true,
            vertical_flips: false,
            transposes: false,
            gamma: r64(0.1),
            channel_gamma: r64(0.0),
            brightness: r64(0.05),
            contrast: r64(0.05),
            hue: r64(0.0),
            saturation: r64(0.0),
            resize: None,
        }
    }
}
