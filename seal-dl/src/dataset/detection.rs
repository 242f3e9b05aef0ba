use super::DatasetError;
use crate::{
    common::*,
    config::{AugmentConfig, Config, LoaderConfig},
    loader::{load_sample, DataLoader, DataLoaderInit},
    processor::{
        transform_testing, transform_training, Encoder, Multiple, NullEncoder, Pipeline, Transform,
    },
    record::{Category, ImageRecord, Target},
    sampler::Sampler,
};

/// The loader of randomized training batches.
pub type TrainLoader<E> = DataLoader<Multiple<Pipeline<E>>>;

/// The loader of deterministic testing batches.
pub type TestLoader<E> = DataLoader<Pipeline<E>>;

/// Annotated images grouped by category, and the class names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionDataset {
    images: HashMap<String, ImageRecord>,
    classes: Vec<String>,
}

impl DetectionDataset {
    pub fn new(images: HashMap<String, ImageRecord>, classes: Vec<String>) -> Self {
        Self { images, classes }
    }

    /// Build from a list of records, rejecting duplicated ids.
    pub fn from_records<I>(records: I, classes: Vec<String>) -> Result<Self>
    where
        I: IntoIterator<Item = ImageRecord>,
    {
        let mut images = HashMap::new();
        for record in records {
            match images.entry(record.id.clone()) {
                hash_map::Entry::Occupied(_) => bail!("duplicated image id '{}'", record.id),
                hash_map::Entry::Vacant(entry) => {
                    entry.insert(record);
                }
            }
        }
        Ok(Self { images, classes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn images(&self) -> &HashMap<String, ImageRecord> {
        &self.images
    }

    pub fn get(&self, id: &str) -> Option<&ImageRecord> {
        self.images.get(id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Insert the record, replacing the one with the same id.
    pub fn update_image(&mut self, record: ImageRecord) {
        self.images.insert(record.id.clone(), record);
    }

    /// The images in a category, or all images if no category is given,
    /// ordered by id.
    pub fn get_images(&self, category: Option<Category>) -> Vec<ImageRecord> {
        self.images
            .values()
            .filter(|record| category.map_or(true, |category| record.category == category))
            .sorted_by(|lhs, rhs| lhs.id.cmp(&rhs.id))
            .cloned()
            .collect()
    }

    pub fn train_images(&self) -> Vec<ImageRecord> {
        self.get_images(Some(Category::Train))
    }

    pub fn test_images(&self) -> Vec<ImageRecord> {
        self.get_images(Some(Category::Test))
    }

    pub fn validate_images(&self) -> Vec<ImageRecord> {
        self.get_images(Some(Category::Validate))
    }

    pub fn new_images(&self) -> Vec<ImageRecord> {
        self.get_images(Some(Category::New))
    }

    pub fn all_images(&self) -> Vec<ImageRecord> {
        self.get_images(None)
    }

    /// Record that the images were scored by model `net_id`.
    ///
    /// Nothing is modified if any of the ids is unknown.
    pub fn mark_evaluated<S>(&mut self, ids: &[S], net_id: u64) -> Result<(), DatasetError>
    where
        S: AsRef<str>,
    {
        if let Some(id) = ids
            .iter()
            .map(|id| id.as_ref())
            .find(|id| !self.images.contains_key(*id))
        {
            return Err(DatasetError::UnknownImage(id.to_string()));
        }

        ids.iter().for_each(|id| {
            if let Some(record) = self.images.get_mut(id.as_ref()) {
                record.evaluated = Some(net_id);
            }
        });

        Ok(())
    }

    /// The number of images per category. Empty categories are absent.
    pub fn count_categories(&self) -> HashMap<Category, usize> {
        self.images.values().map(|record| record.category).counts()
    }

    /// Build the training loader over the train images.
    ///
    /// The epoch is `epoch_size / image_samples` images drawn as repeated
    /// shuffled passes, or a single shuffled pass if the epoch size is unset.
    pub fn train<E>(&self, config: &Config, encoder: &E) -> Result<TrainLoader<E>>
    where
        E: Encoder,
    {
        let Config { loader, augment } = config;
        let images_per_batch = images_per_batch(loader)?;
        let image_samples = loader.image_samples.get();

        let sampler = match loader.epoch_size {
            Some(epoch_size) => Sampler::Repeat {
                num_samples: (epoch_size.get() as f64 / image_samples as f64).round() as usize,
            },
            None => Sampler::Shuffle,
        };

        let loader = DataLoaderInit {
            records: self.train_images(),
            transform: transform_training(augment, image_samples, encoder)?,
            sampler,
            batch_size: images_per_batch,
            num_workers: loader.num_workers(),
            seed: loader.seed,
        }
        .build()?;

        info!(
            "training loader with {} images, {} batches per epoch",
            loader.records().len(),
            loader.len()
        );
        Ok(loader)
    }

    pub fn sample_train<E>(&self, config: &Config, encoder: &E) -> Result<TrainLoader<E>>
    where
        E: Encoder,
    {
        self.sample_train_on(self.train_images(), config, encoder)
    }

    /// Build a training loader over the given images.
    ///
    /// The epoch is `epoch_size / image_samples` uniform draws with
    /// replacement, or a single pass in list order if the epoch size is unset.
    pub fn sample_train_on<E>(
        &self,
        images: Vec<ImageRecord>,
        config: &Config,
        encoder: &E,
    ) -> Result<TrainLoader<E>>
    where
        E: Encoder,
    {
        let Config { loader, augment } = config;
        let images_per_batch = images_per_batch(loader)?;
        let image_samples = loader.image_samples.get();

        let sampler = match loader.epoch_size {
            Some(epoch_size) => Sampler::Random {
                num_samples: epoch_size.get() / image_samples,
            },
            None => Sampler::Sequential,
        };

        DataLoaderInit {
            records: images,
            transform: transform_training(augment, image_samples, encoder)?,
            sampler,
            batch_size: images_per_batch,
            num_workers: loader.num_workers(),
            seed: loader.seed,
        }
        .build()
    }

    /// Build the testing loader over the given images, one image per batch in
    /// list order.
    pub fn test_on<E>(
        &self,
        images: Vec<ImageRecord>,
        config: &Config,
        encoder: &E,
    ) -> Result<TestLoader<E>>
    where
        E: Encoder,
    {
        DataLoaderInit {
            records: images,
            transform: transform_testing(&config.augment, encoder)?,
            sampler: Sampler::Sequential,
            batch_size: 1,
            num_workers: config.loader.num_workers(),
            seed: config.loader.seed,
        }
        .build()
    }

    pub fn test<E>(&self, config: &Config, encoder: &E) -> Result<TestLoader<E>>
    where
        E: Encoder,
    {
        self.test_on(self.test_images(), config, encoder)
    }

    pub fn validate<E>(&self, config: &Config, encoder: &E) -> Result<TestLoader<E>>
    where
        E: Encoder,
    {
        self.test_on(self.validate_images(), config, encoder)
    }

    /// Load an image for inference with the testing transform applied.
    pub fn load_inference(
        &self,
        id: &str,
        file: impl AsRef<Path>,
        config: &AugmentConfig,
    ) -> Result<Tensor> {
        let record = ImageRecord::new(id, file.as_ref(), Category::New).with_target(Target::empty());
        let sample = load_sample(&record)?;
        let pipeline = transform_testing(config, &NullEncoder)?;

        // the testing transform draws no randomness
        let mut rng = StdRng::seed_from_u64(0);
        let encoded = pipeline.forward(&sample, &mut rng)?;
        Ok(encoded.image)
    }
}

/// The number of loaded images per batch, each expanded into
/// `image_samples` samples.
fn images_per_batch(config: &LoaderConfig) -> Result<usize, DatasetError> {
    let batch_size = config.batch_size.get();
    let image_samples = config.image_samples.get();

    if batch_size % image_samples != 0 {
        return Err(DatasetError::IndivisibleBatch {
            batch_size,
            image_samples,
        });
    }
    Ok(batch_size / image_samples)
}
