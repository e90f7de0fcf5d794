/// Sliding-window extraction over a single observation
use ndarray::{s, Array3, ArrayView2, Axis};

use crate::ForecastError;

/// Number of stride-1 windows of `window_len` steps in `time_steps` rows
pub fn window_count(time_steps: usize, window_len: usize) -> usize {
    (time_steps + 1).saturating_sub(window_len)
}

/// Turn a `(T, V)` observation into `(T - L + 1, L, V)` overlapping windows
///
/// Window `i` is an exact copy of rows `[i, i + L)`.
///
/// # Errors
/// `InsufficientLength` when the observation has fewer than `window_len` rows.
pub fn extract_windows(
    observation: ArrayView2<'_, f32>,
    window_len: usize,
) -> crate::Result<Array3<f32>> {
    let (time_steps, n_variables) = observation.dim();

    if window_len == 0 {
        return Err(ForecastError::Config("window length must be > 0".to_string()));
    }
    if time_steps < window_len {
        return Err(ForecastError::InsufficientLength {
            available: time_steps,
            required: window_len,
        });
    }

    let n_windows = window_count(time_steps, window_len);
    let mut windows = Array3::<f32>::zeros((n_windows, window_len, n_variables));
    for (i, mut window) in windows.axis_iter_mut(Axis(0)).enumerate() {
        window.assign(&observation.slice(s![i..i + window_len, ..]));
    }

    Ok(windows)
}
