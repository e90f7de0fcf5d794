/// Persistence of trained models by name
///
/// A model named `foo` is stored as `foo.safetensors` (weights) plus
/// `foo.json` (architecture) inside the store directory.
use candle_core::Device;
use std::path::{Path, PathBuf};

use super::{ModelConfig, Seq2SeqRegressor};
use crate::ForecastError;

/// Sidecar written next to the weights
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelMetadata {
    /// Architecture used to rebuild the model before loading weights
    pub config: ModelConfig,
    /// Parameter count at save time
    pub num_parameters: usize,
}

/// Directory of saved models
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Weights file for `name`
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.safetensors", name))
    }

    fn metadata_path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Whether a model named `name` has been saved
    pub fn contains(&self, name: &str) -> bool {
        self.path_for(name).is_file() && self.metadata_path_for(name).is_file()
    }

    /// Load a saved model
    ///
    /// # Errors
    /// `ModelNotFound` when either the weights or the sidecar is missing (a
    /// half-present save is logged as a warning). `Config` when the sidecar's
    /// parameter count disagrees with the rebuilt architecture.
    pub fn load(&self, name: &str, device: &Device) -> crate::Result<Seq2SeqRegressor> {
        let weights_path = self.path_for(name);
        let metadata_path = self.metadata_path_for(name);
        if !self.contains(name) {
            if weights_path.is_file() || metadata_path.is_file() {
                log::warn!(
                    "Incomplete save for '{}': {:?} exists={}, {:?} exists={}; it will be overwritten",
                    name,
                    weights_path,
                    weights_path.is_file(),
                    metadata_path,
                    metadata_path.is_file()
                );
            }
            return Err(ForecastError::ModelNotFound(weights_path));
        }

        let metadata: ModelMetadata = serde_json::from_slice(&std::fs::read(&metadata_path)?)?;

        let mut model = Seq2SeqRegressor::build(metadata.config, device)?;
        if model.num_parameters() != metadata.num_parameters {
            return Err(ForecastError::Config(format!(
                "{:?} records {} parameters, rebuilt architecture has {}",
                metadata_path,
                metadata.num_parameters,
                model.num_parameters()
            )));
        }
        model.load_weights(&weights_path)?;

        log::info!("Loaded model '{}' from {:?}", name, weights_path);

        Ok(model)
    }

    /// Save `model` under `name`, overwriting any previous save
    ///
    /// Returns the weights path.
    pub fn save(&self, model: &Seq2SeqRegressor, name: &str) -> crate::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let weights_path = self.path_for(name);
        model.save_weights(&weights_path)?;

        let metadata = ModelMetadata {
            config: model.config().clone(),
            num_parameters: model.num_parameters(),
        };
        std::fs::write(
            self.metadata_path_for(name),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        Ok(weights_path)
    }

    /// Load `name` if it exists, otherwise call `build`
    ///
    /// `build` runs at most once and only when nothing is saved under `name`.
    pub fn load_or_build<F>(
        &self,
        name: &str,
        device: &Device,
        build: F,
    ) -> crate::Result<Seq2SeqRegressor>
    where
        F: FnOnce() -> crate::Result<Seq2SeqRegressor>,
    {
        match self.load(name, device) {
            Ok(model) => Ok(model),
            Err(ForecastError::ModelNotFound(_)) => {
                log::info!("New model created as: {}", name);
                build()
            }
            Err(e) => Err(e),
        }
    }
}
