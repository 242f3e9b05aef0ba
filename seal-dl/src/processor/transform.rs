//! Transform traits and combinators.

use crate::{common::*, record::Sample};

/// A stateless operation on a sample.
///
/// All randomness is drawn from the given generator, so the same generator
/// state always reproduces the same output.
pub trait Transform
where
    Self: Debug + Send + Sync,
{
    type Output;

    fn forward(&self, sample: &Sample, rng: &mut StdRng) -> Result<Self::Output>;
}

/// A stateless operation on the pixels of an image.
pub trait ImageTransform
where
    Self: Debug + Send + Sync,
{
    fn forward_image(&self, image: &Tensor, rng: &mut StdRng) -> Result<Tensor>;
}

impl<T> Transform for Box<T>
where
    T: Transform + ?Sized,
{
    type Output = T::Output;

    fn forward(&self, sample: &Sample, rng: &mut StdRng) -> Result<Self::Output> {
        (**self).forward(sample, rng)
    }
}

impl<T> ImageTransform for Box<T>
where
    T: ImageTransform + ?Sized,
{
    fn forward_image(&self, image: &Tensor, rng: &mut StdRng) -> Result<Tensor> {
        (**self).forward_image(image, rng)
    }
}

/// Draw uniformly in log space between the bounds.
pub fn random_log<R>(rng: &mut R, lower: f64, upper: f64) -> f64
where
    R: Rng + ?Sized,
{
    let (lower, upper) = (lower.ln(), upper.ln());
    if lower >= upper {
        return lower.exp();
    }
    rng.gen_range(lower..upper).exp()
}

/// Draw uniformly from `[-bound, bound]`, or zero if the bound is zero.
pub(crate) fn random_symmetric<R>(rng: &mut R, bound: f64) -> f64
where
    R: Rng + ?Sized,
{
    if bound <= 0.0 {
        0.0
    } else {
        rng.gen_range(-bound..=bound)
    }
}

/// Returns the sample unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform for Identity {
    type Output = Sample;

    fn forward(&self, sample: &Sample, _rng: &mut StdRng) -> Result<Sample> {
        Ok(sample.shallow_clone())
    }
}

/// Sequential composition, applied from the first step to the last.
#[derive(Debug, Default)]
pub struct Compose {
    steps: Vec<Box<dyn Transform<Output = Sample>>>,
}

impl Compose {
    pub fn new() -> Self {
        Self { steps: vec![] }
    }

    pub fn then<T>(mut self, step: T) -> Self
    where
        T: 'static + Transform<Output = Sample>,
    {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Transform for Compose {
    type Output = Sample;

    fn forward(&self, sample: &Sample, rng: &mut StdRng) -> Result<Sample> {
        let mut sample = sample.shallow_clone();
        for step in &self.steps {
            sample = step.forward(&sample, rng)?;
        }
        Ok(sample)
    }
}

/// Runs a transform several independent times on the same input.
#[derive(Debug)]
pub struct Multiple<T> {
    count: usize,
    transform: T,
}

impl<T> Multiple<T>
where
    T: Transform,
{
    pub fn new(count: usize, transform: T) -> Result<Self> {
        ensure!(count > 0, "the number of samples per image must be positive");
        Ok(Self { count, transform })
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl<T> Transform for Multiple<T>
where
    T: Transform,
{
    type Output = Vec<T::Output>;

    fn forward(&self, sample: &Sample, rng: &mut StdRng) -> Result<Self::Output> {
        (0..self.count)
            .map(|_| self.transform.forward(sample, rng))
            .collect()
    }
}

/// Lifts image transforms to a sample transform touching only the `image`
/// field. The steps run in order.
#[derive(Debug, Default)]
pub struct OnImage {
    steps: Vec<Box<dyn ImageTransform>>,
}

impl OnImage {
    pub fn new() -> Self {
        Self { steps: vec![] }
    }

    pub fn then<T>(mut self, step: T) -> Self
    where
        T: 'static + ImageTransform,
    {
        self.steps.push(Box::new(step));
        self
    }
}

impl Transform for OnImage {
    type Output = Sample;

    fn forward(&self, sample: &Sample, rng: &mut StdRng) -> Result<Sample> {
        let mut image = sample.image.shallow_clone();
        for step in &self.steps {
            image = step.forward_image(&image, rng)?;
        }
        Ok(sample.shallow_clone().with_image(image))
    }
}
