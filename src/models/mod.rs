/// Sequence-to-sequence regressor
use candle_core::{DType, Device, Result, Tensor, Var};
use candle_nn::{VarBuilder, VarMap};
use std::collections::BTreeMap;
use std::path::Path;

use crate::layers::{Dense, GruEncoder};

pub mod store;

pub use store::ModelStore;

/// Architecture of a [`Seq2SeqRegressor`]
///
/// Persisted next to the weights so a saved model can be rebuilt.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelConfig {
    /// Variables per input time step
    pub n_variables: usize,
    /// Input sequence length
    pub len_input: usize,
    /// Predicted sequence length
    pub len_prediction: usize,
    /// GRU hidden width
    pub hidden_size: usize,
}

impl ModelConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.n_variables == 0 || self.len_input == 0 || self.len_prediction == 0 {
            return Err(crate::ForecastError::Config(
                "n_variables, len_input and len_prediction must be > 0".to_string(),
            ));
        }
        if self.hidden_size == 0 {
            return Err(crate::ForecastError::Config(
                "hidden_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// GRU encoder followed by a dense head that emits the whole forecast at once
///
/// Maps `[batch, len_input, n_variables]` to `[batch, len_prediction]`.
/// All trainable parameters live in the model's `VarMap`.
pub struct Seq2SeqRegressor {
    config: ModelConfig,
    varmap: VarMap,
    encoder: GruEncoder,
    head: Dense,
    device: Device,
}

impl Seq2SeqRegressor {
    /// Build a freshly initialised model
    pub fn build(config: ModelConfig, device: &Device) -> crate::Result<Self> {
        config.validate()?;

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

        let encoder = GruEncoder::new(config.n_variables, config.hidden_size, vb.pp("encoder"))?;
        let head = Dense::new(config.hidden_size, config.len_prediction, true, vb.pp("head"))?;

        Ok(Self {
            config,
            varmap,
            encoder,
            head,
            device: device.clone(),
        })
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Input windows `[batch, len_input, n_variables]`
    ///
    /// # Returns
    /// Forecast for the target variable `[batch, len_prediction]`
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (_, seq_len, n_variables) = x.dims3()?;
        if seq_len != self.config.len_input || n_variables != self.config.n_variables {
            candle_core::bail!(
                "expected input [batch, {}, {}], got {:?}",
                self.config.len_input,
                self.config.n_variables,
                x.dims()
            );
        }

        let encoded = self.encoder.forward(x)?;
        self.head.forward(&encoded)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Trainable variables, for the optimizer
    pub fn trainable_vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }

    /// Total number of scalar parameters
    pub fn num_parameters(&self) -> usize {
        self.varmap
            .all_vars()
            .iter()
            .map(|v| v.as_tensor().elem_count())
            .sum()
    }

    /// Copy of every parameter, keyed by name
    pub fn parameter_snapshot(&self) -> Result<BTreeMap<String, Vec<f32>>> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|_| candle_core::Error::Msg("variable map lock poisoned".to_string()))?;

        let mut snapshot = BTreeMap::new();
        for (name, var) in data.iter() {
            let values = var.as_tensor().flatten_all()?.to_vec1::<f32>()?;
            snapshot.insert(name.clone(), values);
        }
        Ok(snapshot)
    }

    /// Write weights as safetensors
    pub(crate) fn save_weights(&self, path: &Path) -> Result<()> {
        self.varmap.save(path)
    }

    /// Overwrite weights in place from a safetensors file
    pub(crate) fn load_weights(&mut self, path: &Path) -> Result<()> {
        self.varmap.load(path)
    }

    /// Log a short summary of the architecture
    pub fn log_summary(&self) {
        log::info!(
            "Seq2SeqRegressor: input [{} x {}] -> GRU({}) -> dense -> [{}], {} parameters",
            self.config.len_input,
            self.config.n_variables,
            self.config.hidden_size,
            self.config.len_prediction,
            self.num_parameters()
        );
    }
}
