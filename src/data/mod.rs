/// Observation loading, windowing and batch sampling
pub mod batch;
pub mod observation;
pub mod window;

pub use batch::{sample_batch, Batch};
pub use observation::{is_data_file, train_slice, validation_slice, NpyDirectory};
pub use window::extract_windows;

use ndarray::Array2;
use std::path::PathBuf;

/// Source of raw observations, one per named file
pub trait ObservationSource {
    /// Names of all observations, already filtered to data files
    fn list(&self) -> crate::Result<Vec<String>>;

    /// Load one observation as a `(time_steps, n_variables)` array
    fn load(&self, name: &str) -> crate::Result<Array2<f32>>;

    /// Location used in log and error messages
    fn describe(&self) -> PathBuf;
}
