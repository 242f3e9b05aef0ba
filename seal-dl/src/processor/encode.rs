//! Target encoding, the last step of every pipeline.

use super::{Compose, Transform};
use crate::{
    collate::Collate,
    common::*,
    record::{EncodedSample, Sample, Target},
};

/// Converts an image and its ground truth into the training targets of a
/// detection model.
pub trait Encoder
where
    Self: Debug + Clone + Send + Sync + 'static,
{
    type Encoding: Collate + Send + 'static;

    fn encode(&self, image: &Tensor, target: &Target) -> Result<Self::Encoding>;

    /// Clone the encoder with its tensors moved to the device.
    fn to_device(&self, device: Device) -> Self;
}

/// An encoder that produces nothing. Used where only images are needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEncoder;

impl Encoder for NullEncoder {
    type Encoding = ();

    fn encode(&self, _image: &Tensor, _target: &Target) -> Result<()> {
        Ok(())
    }

    fn to_device(&self, _device: Device) -> Self {
        *self
    }
}

/// Attaches the encoder output to a sample.
#[derive(Debug, Clone)]
pub struct EncodeTarget<E> {
    encoder: E,
}

impl<E> EncodeTarget<E>
where
    E: Encoder,
{
    pub fn new(encoder: E) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn encode(&self, sample: Sample) -> Result<EncodedSample<E::Encoding>> {
        let Sample {
            id, image, target, ..
        } = sample;
        let encoding = self
            .encoder
            .encode(&image, &target)
            .with_context(|| format!("failed to encode sample '{}'", id))?;

        Ok(EncodedSample {
            image,
            encoding,
            lengths: target.len(),
            target,
            id,
        })
    }
}

/// Augmentation steps followed by target encoding.
#[derive(Debug)]
pub struct Pipeline<E> {
    transform: Compose,
    encode: EncodeTarget<E>,
}

impl<E> Pipeline<E>
where
    E: Encoder,
{
    pub fn new(transform: Compose, encoder: E) -> Self {
        Self {
            transform,
            encode: EncodeTarget::new(encoder),
        }
    }
}

impl<E> Transform for Pipeline<E>
where
    E: Encoder,
{
    type Output = EncodedSample<E::Encoding>;

    fn forward(&self, sample: &Sample, rng: &mut StdRng) -> Result<Self::Output> {
        let sample = self.transform.forward(sample, rng)?;
        self.encode.encode(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Scale;

    /// Encodes the number of instances, enough to check the plumbing.
    #[derive(Debug, Clone)]
    struct CountEncoder;

    impl Encoder for CountEncoder {
        type Encoding = i64;

        fn encode(&self, _image: &Tensor, target: &Target) -> Result<i64> {
            Ok(target.len() as i64)
        }

        fn to_device(&self, _device: Device) -> Self {
            self.clone()
        }
    }

    #[test]
    fn pipeline_passes_fields_through() {
        let mut rng = StdRng::seed_from_u64(0);
        let target = Target::from_parts(&[[0.0, 0.0, 2.0, 2.0], [1.0, 1.0, 3.0, 3.0]], &[1, 0])
            .unwrap();
        let image = Tensor::rand(&[3, 8, 8], (Kind::Float, Device::Cpu));
        let sample = Sample::new("encoded", image, target).unwrap();

        let pipeline = Pipeline::new(Compose::new().then(Scale::new(2.0).unwrap()), CountEncoder);
        let encoded = pipeline.forward(&sample, &mut rng).unwrap();

        assert_eq!(encoded.id, "encoded");
        assert_eq!(encoded.encoding, 2);
        assert_eq!(encoded.lengths, 2);
        assert_eq!(encoded.target.label(), vec![1, 0]);
        assert_eq!(encoded.image.size(), vec![3, 16, 16]);
    }

    #[test]
    fn null_encoder_accepts_empty_target() {
        let image = Tensor::zeros(&[3, 4, 4], (Kind::Float, Device::Cpu));
        let sample = Sample::new("empty", image, Target::empty()).unwrap();
        let encoded = EncodeTarget::new(NullEncoder).encode(sample).unwrap();
        assert_eq!(encoded.lengths, 0);
        assert!(encoded.target.is_empty());
    }
}
