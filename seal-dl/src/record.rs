//! Image, target and sample records.

use crate::{common::*, label::Instance};

/// The role of an image in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Train,
    Test,
    Validate,
    New,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Train,
        Category::Test,
        Category::Validate,
        Category::New,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Train => "train",
            Category::Test => "test",
            Category::Validate => "validate",
            Category::New => "new",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == text)
            .ok_or_else(|| format_err!("unknown image category '{}'", text))
    }
}

/// The ground truth of an image.
///
/// Boxes and labels are stored together per instance so their counts cannot
/// diverge.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Target {
    instances: Vec<Instance>,
}

impl Target {
    /// The zero-instance target.
    pub fn empty() -> Self {
        Self { instances: vec![] }
    }

    pub fn new(instances: Vec<Instance>) -> Self {
        Self { instances }
    }

    /// Build from boxes in `[xmin, ymin, xmax, ymax]` order and class indices.
    pub fn from_parts(bbox: &[[f64; 4]], label: &[usize]) -> Result<Self> {
        ensure!(
            bbox.len() == label.len(),
            "expect the same number of boxes and labels, but get {} and {}",
            bbox.len(),
            label.len()
        );

        let instances: Vec<_> = bbox
            .iter()
            .zip(label)
            .map(|(&xyxy, &class)| -> Result<_> {
                let rect = TLBR::try_from_xyxy(xyxy)
                    .with_context(|| format!("invalid box {:?}", xyxy))?;
                Ok(Label::new(rect, class))
            })
            .collect::<Result<_>>()?;

        Ok(Self { instances })
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn into_instances(self) -> Vec<Instance> {
        self.instances
    }

    /// Boxes in `[xmin, ymin, xmax, ymax]` order.
    pub fn bbox(&self) -> Vec<[f64; 4]> {
        self.instances
            .iter()
            .map(|instance| instance.rect.xyxy())
            .collect()
    }

    pub fn label(&self) -> Vec<usize> {
        self.instances
            .iter()
            .map(|instance| instance.class)
            .collect()
    }

    /// Derive a target with every box replaced.
    pub fn map_boxes<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&TLBR<f64>) -> TLBR<f64>,
    {
        let instances = self
            .instances
            .iter()
            .map(|instance| Label::new(f(&instance.rect), instance.class))
            .collect();
        Self { instances }
    }

    pub fn transform(&self, transform: &RectTransform<f64>) -> Self {
        let instances = self
            .instances
            .iter()
            .map(|instance| transform * instance)
            .collect();
        Self { instances }
    }

    /// Derive a target keeping the instances accepted by the predicate.
    pub fn retain<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Instance) -> bool,
    {
        let instances = self
            .instances
            .iter()
            .filter(|instance| predicate(instance))
            .cloned()
            .collect();
        Self { instances }
    }
}

/// An annotated image known to the dataset. It carries no pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: String,
    pub file: PathBuf,
    pub category: Category,
    /// The id of the model that last scored this image.
    pub evaluated: Option<u64>,
    pub target: Target,
}

impl ImageRecord {
    pub fn new(id: impl Into<String>, file: impl Into<PathBuf>, category: Category) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            category,
            evaluated: None,
            target: Target::empty(),
        }
    }

    pub fn with_target(self, target: Target) -> Self {
        Self { target, ..self }
    }
}

/// A loaded image with its ground truth.
///
/// Transforms never modify a sample. They derive a new one with the
/// `with_*` methods, sharing the untouched tensors.
#[derive(Debug)]
pub struct Sample {
    pub id: String,
    /// Pixels in CHW layout, float values in `[0, 1]`.
    pub image: Tensor,
    /// The size of the source image file.
    pub image_size: HW<i64>,
    pub target: Target,
}

impl Sample {
    pub fn new(id: impl Into<String>, image: Tensor, target: Target) -> Result<Self> {
        let (_channels, height, width) = image
            .size3()
            .with_context(|| "image must be a 3 dimensional tensor")?;

        Ok(Self {
            id: id.into(),
            image,
            image_size: HW::try_from_hw([height, width])?,
            target,
        })
    }

    pub fn shallow_clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            image: self.image.shallow_clone(),
            image_size: self.image_size,
            target: self.target.clone(),
        }
    }

    pub fn with_image(self, image: Tensor) -> Self {
        Self { image, ..self }
    }

    pub fn with_target(self, target: Target) -> Self {
        Self { target, ..self }
    }

    /// The size of the current image tensor.
    pub fn hw(&self) -> Result<HW<i64>> {
        let (_channels, height, width) = self.image.size3()?;
        HW::try_from_hw([height, width])
    }
}

/// A sample with the encoder output attached.
#[derive(Debug)]
pub struct EncodedSample<E> {
    pub image: Tensor,
    pub encoding: E,
    pub target: Target,
    /// The number of instances in `target`.
    pub lengths: usize,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parts_must_match() {
        let target = Target::from_parts(&[[0.0, 0.0, 4.0, 2.0], [1.0, 1.0, 2.0, 3.0]], &[0, 1])
            .unwrap();
        assert_eq!(target.len(), 2);
        assert_eq!(target.bbox()[0], [0.0, 0.0, 4.0, 2.0]);
        assert_eq!(target.label(), vec![0, 1]);

        assert!(Target::from_parts(&[[0.0, 0.0, 4.0, 2.0]], &[0, 1]).is_err());
        assert!(Target::from_parts(&[[4.0, 0.0, 0.0, 2.0]], &[0]).is_err());
        assert!(Target::empty().is_empty());
    }

    #[test]
    fn category_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("unknown".parse::<Category>().is_err());
    }
}
