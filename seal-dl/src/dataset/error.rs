use thiserror::Error;

/// Precondition failures of dataset operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    #[error("unknown image '{0}'")]
    UnknownImage(String),
    #[error("batch_size {batch_size} should be a multiple of image_samples {image_samples}")]
    IndivisibleBatch {
        batch_size: usize,
        image_samples: usize,
    },
}
