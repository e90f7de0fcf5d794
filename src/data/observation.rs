/// Observation files on disk and the train/validation split
use ndarray::{s, Array2, ArrayView2};
use ndarray_npy::ReadNpyExt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::ObservationSource;
use crate::ForecastError;

/// Number of trailing rows held out for validation: `ceil(T * val_size)`
///
/// Products within `1e-9` of an integer snap to it first, so float noise such
/// as `100.0 * 0.07 == 7.000000000000001` does not round up an extra row.
pub fn validation_rows(time_steps: usize, val_size: f64) -> usize {
    let exact = time_steps as f64 * val_size;
    let nearest = exact.round();
    let rows = if (exact - nearest).abs() < 1e-9 {
        nearest
    } else {
        exact.ceil()
    };
    (rows as usize).min(time_steps)
}

/// Leading rows used for training: `[0, T - ceil(T * val_size))`
pub fn train_slice(observation: ArrayView2<'_, f32>, val_size: f64) -> ArrayView2<'_, f32> {
    let time_steps = observation.nrows();
    let end = time_steps - validation_rows(time_steps, val_size);
    observation.slice_move(s![..end, ..])
}

/// Trailing rows used for validation, widened by `len_input` rows of context
///
/// The first validation window reads its `len_input` conditioning steps from
/// the end of the train region, so every validation target row falls in the
/// held-out tail and never in rows the optimizer has fitted.
pub fn validation_slice(
    observation: ArrayView2<'_, f32>,
    val_size: f64,
    len_input: usize,
) -> ArrayView2<'_, f32> {
    let time_steps = observation.nrows();
    let held_out = validation_rows(time_steps, val_size);
    let start = time_steps.saturating_sub(held_out + len_input);
    observation.slice_move(s![start.., ..])
}

/// Allow-list for observation files: visible `.npy` files only
pub fn is_data_file(name: &str) -> bool {
    !name.starts_with('.')
        && Path::new(name)
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("npy"))
}

/// Directory of `.npy` observation files
#[derive(Debug, Clone)]
pub struct NpyDirectory {
    root: PathBuf,
}

impl NpyDirectory {
    /// Create a source rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Read one observation, accepting f32 or f64 payloads
    pub fn read_observation<P: AsRef<Path>>(path: P) -> crate::Result<Array2<f32>> {
        let path = path.as_ref();
        let file_label = path.display().to_string();

        let as_f32 = <Array2<f32> as ReadNpyExt>::read_npy(BufReader::new(File::open(path)?));
        match as_f32 {
            Ok(array) => Ok(array),
            Err(first) => {
                // numpy saves float64 by default
                let as_f64 = <Array2<f64> as ReadNpyExt>::read_npy(BufReader::new(File::open(path)?))
                    .map_err(|e| ForecastError::Observation {
                        file: file_label.clone(),
                        reason: format!("not a 2D f32 array ({}) nor f64 array ({})", first, e),
                    })?;
                Ok(as_f64.mapv(|x| x as f32))
            }
        }
    }
}

impl ObservationSource for NpyDirectory {
    fn list(&self) -> crate::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_data_file(&name) {
                names.push(name);
            } else {
                log::debug!("Ignoring non-observation file: {}", name);
            }
        }
        names.sort();

        log::info!("Indexed {} observation files in {:?}", names.len(), self.root);

        Ok(names)
    }

    fn load(&self, name: &str) -> crate::Result<Array2<f32>> {
        let path = self.root.join(name);
        Self::read_observation(&path).map_err(|e| match e {
            // Unreadable files are skipped like malformed ones
            ForecastError::Io(io) => ForecastError::Observation {
                file: name.to_string(),
                reason: io.to_string(),
            },
            other => other,
        })
    }

    fn describe(&self) -> PathBuf {
        self.root.clone()
    }
}
