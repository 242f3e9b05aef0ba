//! Parallel loading, transforming and batching of image records.

use crate::{
    collate::Collate,
    common::*,
    processor::Transform,
    profiling::SampleTimer,
    record::{ImageRecord, Sample},
    sampler::Sampler,
    utils::load_image_file,
};

/// The stream of batches produced by a [DataLoader].
pub type BatchStream<B> = Pin<Box<dyn Stream<Item = Result<B>> + Send>>;

/// Load the image of a record into a sample.
pub fn load_sample(record: &ImageRecord) -> Result<Sample> {
    let image = load_image_file(&record.file)?;
    Sample::new(record.id.clone(), image, record.target.clone())
}

#[derive(Debug)]
pub struct DataLoaderInit<T> {
    pub records: Vec<ImageRecord>,
    pub transform: T,
    pub sampler: Sampler,
    /// The number of drawn images per batch.
    pub batch_size: usize,
    pub num_workers: usize,
    /// Seeds the sampling and augmentation. Drawn from entropy when unset.
    pub seed: Option<u64>,
}

impl<T> DataLoaderInit<T>
where
    T: 'static + Transform,
    T::Output: 'static + Collate + Send,
    <T::Output as Collate>::Batch: 'static + Send,
{
    pub fn build(self) -> Result<DataLoader<T>> {
        let Self {
            records,
            transform,
            sampler,
            batch_size,
            num_workers,
            seed,
        } = self;
        ensure!(batch_size > 0, "batch_size must be positive");
        ensure!(num_workers > 0, "num_workers must be positive");

        if records.is_empty() {
            warn!("data loader created over an empty image list");
        }

        Ok(DataLoader {
            records: Arc::new(records),
            transform: Arc::new(transform),
            sampler,
            batch_size,
            num_workers,
            seed,
        })
    }
}

/// Loads and transforms drawn records on worker threads, then collates them
/// into batches in draw order.
///
/// Every draw carries its own random seed taken from the loader seed in draw
/// order, so a seeded loader yields the same batches for any worker count.
#[derive(Debug)]
pub struct DataLoader<T> {
    records: Arc<Vec<ImageRecord>>,
    transform: Arc<T>,
    sampler: Sampler,
    batch_size: usize,
    num_workers: usize,
    seed: Option<u64>,
}

impl<T> DataLoader<T>
where
    T: 'static + Transform,
    T::Output: 'static + Collate + Send,
    <T::Output as Collate>::Batch: 'static + Send,
{
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn sampler(&self) -> Sampler {
        self.sampler
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The number of drawn images per epoch.
    pub fn num_draws(&self) -> usize {
        self.sampler.num_draws(self.records.len())
    }

    /// The number of batches per epoch.
    pub fn len(&self) -> usize {
        (self.num_draws() + self.batch_size - 1) / self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start one epoch.
    pub fn stream(&self) -> BatchStream<<T::Output as Collate>::Batch> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let draws: Vec<(usize, u64)> = self
            .sampler
            .indices(self.records.len(), &mut rng)
            .into_iter()
            .map(|index| (index, rng.gen()))
            .collect();
        debug!(
            "start an epoch of {} draws over {} images",
            draws.len(),
            self.records.len()
        );

        let records = self.records.clone();
        let transform = self.transform.clone();

        let stream = stream::iter(draws).par_map(self.num_workers, move |(index, seed)| {
            let records = records.clone();
            let transform = transform.clone();

            move || -> Result<T::Output> {
                let record = &records[index];
                let mut timer = SampleTimer::start(&record.id);

                let sample = load_sample(record)
                    .with_context(|| format!("failed to load image '{}'", record.id))?;
                timer.stage("load_image");

                let mut rng = StdRng::seed_from_u64(seed);
                let output = transform
                    .forward(&sample, &mut rng)
                    .with_context(|| format!("failed to transform image '{}'", record.id))?;
                timer.stage("transform");

                Ok(output)
            }
        });

        let stream = stream.chunks(self.batch_size).map(|results| -> Result<_> {
            let items: Vec<T::Output> = results.into_iter().collect::<Result<_>>()?;
            <T::Output as Collate>::collate(items)
        });

        Box::pin(stream)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        processor::{Compose, NullEncoder, Pipeline, ResizeTo},
        record::{Category, Target},
    };

    /// Write solid colour PNG images and return their records.
    pub(crate) fn write_images(dir: &Path, sizes: &[(i64, i64)]) -> Vec<ImageRecord> {
        sizes
            .iter()
            .enumerate()
            .map(|(index, &(height, width))| {
                let id = format!("image{}", index);
                let file = dir.join(format!("{}.png", id));
                let image = Tensor::full(
                    &[3, height, width],
                    (index as i64 * 40) % 256,
                    (Kind::Uint8, Device::Cpu),
                );
                vision::image::save(&image, &file).unwrap();

                let target =
                    Target::from_parts(&[[1.0, 1.0, 3.0, 3.0]], &[index % 2]).unwrap();
                ImageRecord::new(id, file, Category::Train).with_target(target)
            })
            .collect()
    }

    fn loader(
        records: Vec<ImageRecord>,
        sampler: Sampler,
        num_workers: usize,
    ) -> DataLoader<Pipeline<NullEncoder>> {
        let transform = Pipeline::new(Compose::new().then(ResizeTo::new(8, 8).unwrap()), NullEncoder);
        DataLoaderInit {
            records,
            transform,
            sampler,
            batch_size: 2,
            num_workers,
            seed: Some(7),
        }
        .build()
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stream_batches_in_draw_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let records = write_images(dir.path(), &[(10, 12), (16, 8), (9, 9)]);
        let loader = loader(records, Sampler::Sequential, 2);
        assert_eq!(loader.len(), 2);

        let batches: Vec<_> = loader.stream().try_collect().await?;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].image.size(), vec![2, 3, 8, 8]);
        assert_eq!(batches[1].image.size(), vec![1, 3, 8, 8]);
        assert_eq!(batches[0].id, vec!["image0", "image1"]);
        assert_eq!(batches[1].id, vec!["image2"]);
        assert_eq!(Vec::<i64>::from(&batches[0].lengths), vec![1, 1]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn seeded_stream_ignores_worker_count() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let records = write_images(dir.path(), &[(10, 12), (16, 8), (9, 9), (11, 7)]);
        let sampler = Sampler::Repeat { num_samples: 6 };

        let ids = |batches: Vec<crate::collate::EncodedBatch<()>>| -> Vec<String> {
            batches.into_iter().flat_map(|batch| batch.id).collect()
        };
        let lhs = ids(loader(records.clone(), sampler, 1).stream().try_collect().await?);
        let rhs = ids(loader(records, sampler, 4).stream().try_collect().await?);
        assert_eq!(lhs.len(), 6);
        assert_eq!(lhs, rhs);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_file_fails_the_batch() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let records = vec![ImageRecord::new(
            "missing",
            dir.path().join("missing.png"),
            Category::Test,
        )];
        let loader = loader(records, Sampler::Sequential, 1);
        let results: Vec<_> = loader.stream().collect().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
        Ok(())
    }

    #[test]
    fn empty_loader_has_no_batches() {
        let loader = loader(vec![], Sampler::Shuffle, 1);
        assert!(loader.is_empty());
    }
}
