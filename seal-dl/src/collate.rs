//! Merging samples into batches.

use crate::{
    common::*,
    record::{EncodedSample, Target},
};

/// Types that merge a list of values into one batch value.
pub trait Collate
where
    Self: Sized,
{
    type Batch;

    fn collate(items: Vec<Self>) -> Result<Self::Batch>;
}

/// The instances of a batch concatenated over all samples.
#[derive(Debug)]
pub struct TargetBatch {
    /// Boxes in `[xmin, ymin, xmax, ymax]` order with shape `[M, 4]`.
    pub bbox: Tensor,
    /// Class indices with shape `[M]`.
    pub label: Tensor,
}

/// A batch of encoded samples.
#[derive(Debug)]
pub struct EncodedBatch<B> {
    /// Images with shape `[N, C, H, W]`.
    pub image: Tensor,
    pub encoding: B,
    pub target: TargetBatch,
    /// The instance counts of each sample with shape `[N]`.
    pub lengths: Tensor,
    pub id: Vec<String>,
}

impl Collate for Tensor {
    type Batch = Tensor;

    fn collate(items: Vec<Self>) -> Result<Tensor> {
        ensure!(!items.is_empty(), "cannot stack an empty list of tensors");
        let batch = Tensor::f_stack(&items, 0)?;
        Ok(batch)
    }
}

impl Collate for Target {
    type Batch = TargetBatch;

    fn collate(items: Vec<Self>) -> Result<TargetBatch> {
        let instances: Vec<_> = items
            .into_iter()
            .flat_map(|target| target.into_instances())
            .collect();
        let num_instances = instances.len() as i64;

        let bbox: Vec<[f32; 4]> = instances
            .iter()
            .map(|instance| {
                let [x0, y0, x1, y1] = instance.rect.xyxy();
                [x0 as f32, y0 as f32, x1 as f32, y1 as f32]
            })
            .collect();
        let label: Vec<i64> = instances
            .iter()
            .map(|instance| instance.class as i64)
            .collect();

        Ok(TargetBatch {
            bbox: Tensor::of_slice(bbox.flat()).view([num_instances, 4]),
            label: Tensor::of_slice(&label),
        })
    }
}

impl<E> Collate for EncodedSample<E>
where
    E: Collate,
{
    type Batch = EncodedBatch<E::Batch>;

    fn collate(items: Vec<Self>) -> Result<Self::Batch> {
        let (image, encoding, target, lengths, id) = items
            .into_iter()
            .map(|sample| {
                let EncodedSample {
                    image,
                    encoding,
                    target,
                    lengths,
                    id,
                } = sample;
                (image, encoding, target, lengths, id)
            })
            .unzip_n_vec();

        Ok(EncodedBatch {
            image: Tensor::collate(image).with_context(|| "failed to stack images")?,
            encoding: E::collate(encoding)?,
            target: Target::collate(target)?,
            lengths: usize::collate(lengths)?,
            id: String::collate(id)?,
        })
    }
}

impl<T> Collate for Vec<T>
where
    T: Collate,
{
    type Batch = T::Batch;

    fn collate(items: Vec<Self>) -> Result<T::Batch> {
        T::collate(items.into_iter().flatten().collect())
    }
}

impl Collate for String {
    type Batch = Vec<String>;

    fn collate(items: Vec<Self>) -> Result<Vec<String>> {
        Ok(items)
    }
}

impl<T> Collate for Option<T> {
    type Batch = Vec<Option<T>>;

    fn collate(items: Vec<Self>) -> Result<Self::Batch> {
        Ok(items)
    }
}

impl Collate for usize {
    type Batch = Tensor;

    fn collate(items: Vec<Self>) -> Result<Tensor> {
        let values: Vec<i64> = items.into_iter().map(|value| value as i64).collect();
        Ok(Tensor::of_slice(&values))
    }
}

impl Collate for i64 {
    type Batch = Tensor;

    fn collate(items: Vec<Self>) -> Result<Tensor> {
        Ok(Tensor::of_slice(&items))
    }
}

impl Collate for f64 {
    type Batch = Tensor;

    fn collate(items: Vec<Self>) -> Result<Tensor> {
        Ok(Tensor::of_slice(&items))
    }
}

impl Collate for () {
    type Batch = ();

    fn collate(_items: Vec<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(id: &str, bbox: &[[f64; 4]]) -> EncodedSample<i64> {
        let labels: Vec<_> = (0..bbox.len()).collect();
        let target = Target::from_parts(bbox, &labels).unwrap();
        EncodedSample {
            image: Tensor::zeros(&[3, 4, 5], (Kind::Float, Device::Cpu)),
            encoding: target.len() as i64 * 10,
            lengths: target.len(),
            target,
            id: id.into(),
        }
    }

    #[test]
    fn collate_encoded_samples() {
        let items = vec![
            encoded("a", &[[0.0, 0.0, 1.0, 1.0], [1.0, 1.0, 2.0, 3.0]]),
            encoded("b", &[]),
            encoded("c", &[[2.0, 2.0, 4.0, 4.0]]),
        ];
        let batch = EncodedSample::collate(items).unwrap();

        assert_eq!(batch.image.size(), vec![3, 3, 4, 5]);
        assert_eq!(Vec::<i64>::from(&batch.lengths), vec![2, 0, 1]);
        assert_eq!(Vec::<i64>::from(&batch.encoding), vec![20, 0, 10]);
        assert_eq!(batch.target.bbox.size(), vec![3, 4]);
        assert_eq!(Vec::<i64>::from(&batch.target.label), vec![0, 1, 0]);
        assert_eq!(batch.id, vec!["a", "b", "c"]);
        assert_eq!(batch.target.label.kind(), Kind::Int64);
    }

    #[test]
    fn collate_flattens_sequences() {
        let items = vec![
            vec![encoded("a", &[]), encoded("a", &[[0.0, 0.0, 1.0, 1.0]])],
            vec![encoded("b", &[]), encoded("b", &[])],
        ];
        let batch = Vec::collate(items).unwrap();
        assert_eq!(batch.image.size()[0], 4);
        assert_eq!(batch.id, vec!["a", "a", "b", "b"]);
    }

    #[test]
    fn collate_empty_targets() {
        let batch = Target::collate(vec![Target::empty(), Target::empty()]).unwrap();
        assert_eq!(batch.bbox.size(), vec![0, 4]);
        assert_eq!(batch.label.size(), vec![0]);
    }

    #[test]
    fn collate_scalars() {
        let batch = f64::collate(vec![0.5, 1.5]).unwrap();
        assert_eq!(Vec::<f64>::from(&batch), vec![0.5, 1.5]);
        assert_eq!(Option::collate(vec![Some(1), None]).unwrap(), vec![Some(1), None]);
        assert!(Tensor::collate(vec![]).is_err());
        <()>::collate(vec![(), ()]).unwrap();
    }
}
