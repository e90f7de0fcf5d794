/// Epoch/file training loop with periodic validation
use candle_core::{Device, Tensor};
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::step::GradientStep;
use crate::config::TrainingConfig;
use crate::data::{extract_windows, sample_batch, train_slice, validation_slice, ObservationSource};
use crate::models::{ModelStore, Seq2SeqRegressor};
use crate::ForecastError;

/// Validation runs on every iteration whose index is a multiple of this
pub const VALIDATION_INTERVAL: usize = 100;

/// Outcome of one trained file
#[derive(Debug, Clone)]
pub struct IterationRecord {
    pub epoch: usize,
    /// Position of the file in this epoch's index
    pub iteration: usize,
    pub file: String,
    pub train_loss: f32,
    /// Present on validation iterations that produced a score
    pub validation_loss: Option<f32>,
    pub elapsed: Duration,
}

/// A file that was skipped instead of trained on
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub epoch: usize,
    pub iteration: usize,
    pub file: String,
    pub reason: String,
}

/// Everything that happened during a run
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub iterations: Vec<IterationRecord>,
    pub skipped: Vec<SkippedFile>,
    /// File order used in each epoch
    pub epoch_orders: Vec<Vec<String>>,
    /// Where the model was saved, when the run persisted it
    pub saved_to: Option<PathBuf>,
}

impl TrainingReport {
    /// Mean training loss of one epoch, `None` if nothing was trained
    pub fn mean_train_loss(&self, epoch: usize) -> Option<f32> {
        let losses: Vec<f32> = self
            .iterations
            .iter()
            .filter(|r| r.epoch == epoch)
            .map(|r| r.train_loss)
            .collect();
        if losses.is_empty() {
            None
        } else {
            Some(losses.iter().sum::<f32>() / losses.len() as f32)
        }
    }
}

/// Trainer for [`Seq2SeqRegressor`]
///
/// Owns the optimizer and the random source used for shuffling and batch
/// sampling. The model is borrowed; its parameters change in place.
pub struct Trainer<R: Rng = StdRng> {
    config: TrainingConfig,
    step: GradientStep,
    rng: R,
}

impl Trainer<StdRng> {
    /// Create new trainer, seeding from `config.seed` or from entropy
    pub fn new(config: TrainingConfig, model: &Seq2SeqRegressor) -> crate::Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, model, rng)
    }
}

impl<R: Rng> Trainer<R> {
    /// Create new trainer with an explicit random source
    pub fn with_rng(config: TrainingConfig, model: &Seq2SeqRegressor, rng: R) -> crate::Result<Self> {
        config.validate()?;

        let model_config = model.config();
        if model_config.len_input != config.len_input
            || model_config.len_prediction != config.len_prediction
        {
            return Err(ForecastError::Config(format!(
                "model expects len_input={} len_prediction={}, configuration has len_input={} len_prediction={}",
                model_config.len_input,
                model_config.len_prediction,
                config.len_input,
                config.len_prediction
            )));
        }

        let step = GradientStep::new(model, config.learning_rate)?;

        Ok(Self { config, step, rng })
    }

    /// Number of gradient updates applied so far
    pub fn steps(&self) -> usize {
        self.step.steps()
    }

    /// Window a slice, sample a batch and move it to `device`
    fn prepare_batch(
        &mut self,
        slice: ArrayView2<'_, f32>,
        device: &Device,
    ) -> crate::Result<(Tensor, Tensor)> {
        let windows = extract_windows(slice, self.config.window_len())?;
        let batch = sample_batch(
            &windows,
            self.config.batch_size,
            self.config.len_input,
            self.config.len_prediction,
            &mut self.rng,
        )?;
        Ok(batch.to_tensors(device)?)
    }

    fn load_checked(
        &self,
        model: &Seq2SeqRegressor,
        source: &impl ObservationSource,
        file: &str,
    ) -> crate::Result<ndarray::Array2<f32>> {
        let observation = source.load(file)?;
        let expected = model.config().n_variables;
        if observation.ncols() != expected {
            return Err(ForecastError::Observation {
                file: file.to_string(),
                reason: format!("{} variables, model expects {}", observation.ncols(), expected),
            });
        }
        Ok(observation)
    }

    /// Train on the train slice of one file
    fn train_file(
        &mut self,
        model: &Seq2SeqRegressor,
        source: &impl ObservationSource,
        file: &str,
    ) -> crate::Result<f32> {
        let observation = self.load_checked(model, source, file)?;
        let slice = train_slice(observation.view(), self.config.val_size);
        let (x, y) = self.prepare_batch(slice, model.device())?;
        Ok(self.step.train_on_batch(model, &x, &y)?)
    }

    /// Score the validation slice of one file without updating the model
    fn validate_file(
        &mut self,
        model: &Seq2SeqRegressor,
        source: &impl ObservationSource,
        file: &str,
    ) -> crate::Result<f32> {
        // Same file, reloaded from the source
        let observation = self.load_checked(model, source, file)?;
        let slice = validation_slice(observation.view(), self.config.val_size, self.config.len_input);
        let (x, y) = self.prepare_batch(slice, model.device())?;
        Ok(GradientStep::evaluate(model, &x, &y)?)
    }

    /// One pass over `files` in the given order
    pub fn train_epoch(
        &mut self,
        model: &Seq2SeqRegressor,
        source: &impl ObservationSource,
        files: &[String],
        epoch: usize,
        report: &mut TrainingReport,
    ) -> crate::Result<()> {
        for (iteration, file) in files.iter().enumerate() {
            let start = Instant::now();

            let train_loss = match self.train_file(model, source, file) {
                Ok(loss) => loss,
                Err(e) if e.is_recoverable() => {
                    log::warn!("{}.{}   Skipping {}: {}", epoch, iteration, file, e);
                    report.skipped.push(SkippedFile {
                        epoch,
                        iteration,
                        file: file.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let validation_loss = if iteration % VALIDATION_INTERVAL == 0 {
                match self.validate_file(model, source, file) {
                    Ok(loss) => Some(loss),
                    Err(e) if e.is_recoverable() => {
                        log::warn!("{}.{}   No validation score for {}: {}", epoch, iteration, file, e);
                        None
                    }
                    Err(e) => return Err(e),
                }
            } else {
                None
            };

            let elapsed = start.elapsed();
            match validation_loss {
                Some(val) => log::info!(
                    "{}.{}   \tTraining Loss: {:.6}   \tValidation Loss: {:.6}   \tTime: {:.4}s",
                    epoch,
                    iteration,
                    train_loss,
                    val,
                    elapsed.as_secs_f64()
                ),
                None => log::info!(
                    "{}.{}   \tTraining Loss: {:.6}   \tTime: {:.4}s",
                    epoch,
                    iteration,
                    train_loss,
                    elapsed.as_secs_f64()
                ),
            }

            report.iterations.push(IterationRecord {
                epoch,
                iteration,
                file: file.clone(),
                train_loss,
                validation_loss,
                elapsed,
            });
        }

        Ok(())
    }

    /// Full training loop
    pub fn train(
        &mut self,
        model: &Seq2SeqRegressor,
        source: &impl ObservationSource,
    ) -> crate::Result<TrainingReport> {
        let mut files = source.list()?;
        if files.is_empty() {
            return Err(ForecastError::EmptyFileIndex(source.describe()));
        }

        log::info!(
            "Starting training for {} epochs over {} files",
            self.config.n_epochs,
            files.len()
        );

        let mut report = TrainingReport::default();
        for epoch in 0..self.config.n_epochs {
            if self.config.shuffle {
                files.shuffle(&mut self.rng);
            }
            report.epoch_orders.push(files.clone());

            let skipped_before = report.skipped.len();
            self.train_epoch(model, source, &files, epoch, &mut report)?;

            match report.mean_train_loss(epoch) {
                Some(avg) => log::info!(
                    "Epoch {} complete: avg_loss={:.6}, skipped={}, step={}",
                    epoch,
                    avg,
                    report.skipped.len() - skipped_before,
                    self.steps()
                ),
                None => log::warn!("Epoch {} complete: every file was skipped", epoch),
            }
        }

        log::info!("Training complete.");

        Ok(report)
    }

    /// Train, then persist the model under the configured name
    pub fn run(
        &mut self,
        model: &Seq2SeqRegressor,
        source: &impl ObservationSource,
        store: &ModelStore,
    ) -> crate::Result<TrainingReport> {
        let mut report = self.train(model, source)?;

        let path = store.save(model, &self.config.model_name)?;
        log::info!("Model saved at: {}", path.display());
        report.saved_to = Some(path);

        Ok(report)
    }
}
