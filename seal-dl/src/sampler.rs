//! Index sampling strategies over a list of images.

use crate::common::*;

/// Decides which images are drawn in an epoch and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sampler {
    /// Concatenated shuffled permutations, truncated to exactly
    /// `num_samples` draws.
    Repeat { num_samples: usize },
    /// One shuffled pass over all images.
    Shuffle,
    /// One pass in list order.
    Sequential,
    /// `num_samples` uniform draws with replacement.
    Random { num_samples: usize },
}

impl Sampler {
    /// The number of draws over a list of `len` images.
    pub fn num_draws(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }

        match *self {
            Self::Repeat { num_samples } | Self::Random { num_samples } => num_samples,
            Self::Shuffle | Self::Sequential => len,
        }
    }

    /// Draw the image indices of one epoch.
    pub fn indices<R>(&self, len: usize, rng: &mut R) -> Vec<usize>
    where
        R: Rng + ?Sized,
    {
        if len == 0 {
            return vec![];
        }

        match *self {
            Self::Repeat { num_samples } => {
                let mut indices = Vec::with_capacity(num_samples + len);
                while indices.len() < num_samples {
                    let mut permutation: Vec<_> = (0..len).collect();
                    permutation.shuffle(rng);
                    indices.extend(permutation);
                }
                indices.truncate(num_samples);
                indices
            }
            Self::Shuffle => {
                let mut indices: Vec<_> = (0..len).collect();
                indices.shuffle(rng);
                indices
            }
            Self::Sequential => (0..len).collect(),
            Self::Random { num_samples } => {
                (0..num_samples).map(|_| rng.gen_range(0..len)).collect()
            }
        }
    }
}
