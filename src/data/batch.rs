/// Mini-batch sampling and input/target split
use candle_core::{Device, Tensor};
use ndarray::{s, Array2, Array3, Axis};
use rand::Rng;

use crate::ForecastError;

/// One sampled mini-batch
#[derive(Debug, Clone)]
pub struct Batch {
    /// Model input: `[batch, len_input, n_variables]`
    pub x: Array3<f32>,
    /// Target variable (column 0): `[batch, len_prediction]`
    pub y: Array2<f32>,
    /// Window indices the batch was gathered from
    pub indices: Vec<usize>,
}

impl Batch {
    /// Number of windows in the batch
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Convert to F32 tensors `(x, y)` on `device`
    pub fn to_tensors(&self, device: &Device) -> candle_core::Result<(Tensor, Tensor)> {
        let x = Tensor::from_vec(self.x.iter().copied().collect::<Vec<f32>>(), self.x.dim(), device)?;
        let y = Tensor::from_vec(self.y.iter().copied().collect::<Vec<f32>>(), self.y.dim(), device)?;
        Ok((x, y))
    }
}

/// Sample `min(n_windows, batch_size)` distinct windows and split them
///
/// Input keeps the first `len_input` steps of every variable; the target keeps
/// the last `len_prediction` steps of variable 0.
pub fn sample_batch<R: Rng + ?Sized>(
    windows: &Array3<f32>,
    batch_size: usize,
    len_input: usize,
    len_prediction: usize,
    rng: &mut R,
) -> crate::Result<Batch> {
    let (n_windows, window_len, n_variables) = windows.dim();

    if window_len != len_input + len_prediction {
        return Err(ForecastError::Config(format!(
            "window length {} does not match len_input + len_prediction = {}",
            window_len,
            len_input + len_prediction
        )));
    }
    if n_windows == 0 || n_variables == 0 {
        return Err(ForecastError::InsufficientLength {
            available: 0,
            required: window_len,
        });
    }

    let amount = n_windows.min(batch_size);
    let indices = rand::seq::index::sample(rng, n_windows, amount).into_vec();
    let sampled = windows.select(Axis(0), &indices);

    let x = sampled.slice(s![.., ..len_input, ..]).to_owned();
    let y = sampled.slice(s![.., len_input.., 0]).to_owned();

    Ok(Batch { x, y, indices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    /// Windows where every value encodes (window, step, variable)
    fn labelled_windows(n_windows: usize, window_len: usize, n_variables: usize) -> Array3<f32> {
        Array3::from_shape_fn((n_windows, window_len, n_variables), |(i, t, v)| {
            (i * 1000 + t * 10 + v) as f32
        })
    }

    #[test]
    fn test_batch_is_capped_and_distinct() {
        let windows = labelled_windows(376, 25, 3);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let batch = sample_batch(&windows, 64, 20, 5, &mut rng).unwrap();
            assert_eq!(batch.len(), 64);
            let unique: HashSet<_> = batch.indices.iter().collect();
            assert_eq!(unique.len(), 64);
            assert!(batch.indices.iter().all(|&i| i < 376));
        }
    }

    #[test]
    fn test_fewer_windows_than_batch_size() {
        let windows = labelled_windows(30, 25, 3);
        let mut rng = StdRng::seed_from_u64(1);

        let batch = sample_batch(&windows, 64, 20, 5, &mut rng).unwrap();

        assert_eq!(batch.len(), 30);
        let mut sorted = batch.indices.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_input_target_split() {
        let windows = labelled_windows(10, 7, 2);
        let mut rng = StdRng::seed_from_u64(3);

        let batch = sample_batch(&windows, 4, 4, 3, &mut rng).unwrap();

        assert_eq!(batch.x.dim(), (4, 4, 2));
        assert_eq!(batch.y.dim(), (4, 3));
        for (row, &window) in batch.indices.iter().enumerate() {
            for t in 0..4 {
                for v in 0..2 {
                    assert_eq!(batch.x[[row, t, v]], (window * 1000 + t * 10 + v) as f32);
                }
            }
            for k in 0..3 {
                // Target reads variable 0 of steps 4..7
                assert_eq!(batch.y[[row, k]], (window * 1000 + (4 + k) * 10) as f32);
            }
        }
    }

    #[test]
    fn test_mismatched_window_length_rejected() {
        let windows = labelled_windows(10, 7, 2);
        let mut rng = StdRng::seed_from_u64(3);

        assert!(matches!(
            sample_batch(&windows, 4, 4, 4, &mut rng),
            Err(ForecastError::Config(_))
        ));
    }

    #[test]
    fn test_to_tensors_shapes() -> candle_core::Result<()> {
        let windows = labelled_windows(5, 6, 3);
        let mut rng = StdRng::seed_from_u64(11);
        let batch = sample_batch(&windows, 8, 4, 2, &mut rng).unwrap();

        let (x, y) = batch.to_tensors(&Device::Cpu)?;

        assert_eq!(x.dims(), &[5, 4, 3]);
        assert_eq!(y.dims(), &[5, 2]);
        let y_rows = y.to_vec2::<f32>()?;
        assert_eq!(y_rows[0][0], batch.y[[0, 0]]);
        assert_eq!(y_rows[4][1], batch.y[[4, 1]]);

        Ok(())
    }
}
