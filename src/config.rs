/// Run configuration loaded from `config.yaml`
use std::path::{Path, PathBuf};

use crate::models::ModelConfig;

/// Training run configuration
///
/// Required keys mirror the options recognised by the training pipeline.
/// The optional keys only describe the model architecture and where files live.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrainingConfig {
    /// Number of time steps fed to the model
    pub len_input: usize,

    /// Number of time steps the model predicts
    pub len_prediction: usize,

    /// Upper bound on windows sampled per step
    pub batch_size: usize,

    /// Trailing fraction of each observation held out for validation
    pub val_size: f64,

    /// Adam learning rate (fixed for the whole run)
    pub learning_rate: f64,

    /// Number of passes over the file index
    pub n_epochs: usize,

    /// Reshuffle the file index at the start of every epoch
    pub shuffle: bool,

    /// Name the model is saved and loaded under
    pub model_name: String,

    /// Run on CUDA when available
    pub use_gpu: bool,

    /// Number of variables per time step (column 0 is the target)
    #[serde(default = "default_n_variables")]
    pub n_variables: usize,

    /// Hidden width of the recurrent encoder
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,

    /// Seed for batch sampling and shuffling; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Directory holding the training observations
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory models are persisted to
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

fn default_n_variables() -> usize {
    1
}

fn default_hidden_size() -> usize {
    64
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data_processed/Train")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("saved_models")
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            len_input: 20,
            len_prediction: 5,
            batch_size: 64,
            val_size: 0.2,
            learning_rate: 1e-3,
            n_epochs: 1,
            shuffle: true,
            model_name: "seq2seq".to_string(),
            use_gpu: false,
            n_variables: default_n_variables(),
            hidden_size: default_hidden_size(),
            seed: None,
            data_dir: default_data_dir(),
            model_dir: default_model_dir(),
        }
    }
}

impl TrainingConfig {
    /// Load and validate a YAML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> crate::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        let positive = [
            ("len_input", self.len_input),
            ("len_prediction", self.len_prediction),
            ("batch_size", self.batch_size),
            ("n_epochs", self.n_epochs),
            ("n_variables", self.n_variables),
            ("hidden_size", self.hidden_size),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(crate::ForecastError::Config(format!("{} must be > 0", key)));
            }
        }

        if !(self.val_size > 0.0 && self.val_size < 1.0) {
            return Err(crate::ForecastError::Config(format!(
                "val_size must be in (0, 1), got {}",
                self.val_size
            )));
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(crate::ForecastError::Config(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }

        if self.model_name.trim().is_empty() {
            return Err(crate::ForecastError::Config(
                "model_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Total window length (input followed by prediction)
    pub fn window_len(&self) -> usize {
        self.len_input + self.len_prediction
    }

    /// Architecture of a freshly built model for this run
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            n_variables: self.n_variables,
            len_input: self.len_input,
            len_prediction: self.len_prediction,
            hidden_size: self.hidden_size,
        }
    }
}
