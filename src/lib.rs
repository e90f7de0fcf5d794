//! Seq2seq forecast trainer
//!
//! Trains a sequence-to-sequence regressor on multivariate time series that
//! live on disk as one `.npy` file per observation. Observations are streamed
//! one at a time, cut into sliding windows, mini-batched and fed to an Adam
//! optimizer, with a periodic validation check on a held-out tail.
//!
//! # Pipeline
//!
//! - **Windows**: a `(T, V)` observation becomes `(T - L + 1, L, V)` windows
//! - **Batches**: a capped random subset of windows, split into input and target
//! - **Steps**: forward, MSE, backward and optimizer update
//! - **Loop**: epochs over a (optionally shuffled) file index, then save
//!
//! # Example
//!
//! ```ignore
//! use seq2seq_forecast::{TrainingConfig, data::NpyDirectory, models::ModelStore};
//! use seq2seq_forecast::training::Trainer;
//!
//! let config = TrainingConfig::from_file("config.yaml")?;
//! let store = ModelStore::new(&config.model_dir);
//! let model = store.load_or_build(&config.model_name, &device, || {
//!     Seq2SeqRegressor::build(config.model_config(), &device)
//! })?;
//! let mut trainer = Trainer::new(config.clone(), &model)?;
//! trainer.run(&model, &NpyDirectory::new(&config.data_dir), &store)?;
//! ```

use std::path::PathBuf;

pub mod config;
pub mod data;
pub mod layers;
pub mod models;
pub mod training;
pub mod utils;

// Re-export commonly used items
pub use config::TrainingConfig;
pub use models::{ModelConfig, Seq2SeqRegressor};

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Observation too short: {available} time steps, window needs {required}")]
    InsufficientLength { available: usize, required: usize },

    #[error("No saved model at {0}")]
    ModelNotFound(PathBuf),

    #[error("Bad observation {file}: {reason}")]
    Observation { file: String, reason: String },

    #[error("No observation files found in {0}")]
    EmptyFileIndex(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ForecastError {
    /// Errors that only invalidate a single observation file.
    ///
    /// The training loop skips the file and keeps going on these.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ForecastError::InsufficientLength { .. } | ForecastError::Observation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
