/// Single optimisation step and read-only evaluation
use candle_core::{Result, Tensor};
use candle_nn::{loss, AdamW, Optimizer, ParamsAdamW};

use crate::models::Seq2SeqRegressor;

/// Adam with a fixed learning rate, bound to one model's variables
///
/// The optimizer and its moment estimates are created once and reused for
/// every batch of the run.
pub struct GradientStep {
    optimizer: AdamW,
    steps: usize,
}

impl GradientStep {
    /// Create a step function over every trainable variable of `model`
    pub fn new(model: &Seq2SeqRegressor, learning_rate: f64) -> Result<Self> {
        // weight_decay = 0 turns AdamW into plain Adam
        let params = ParamsAdamW {
            lr: learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-7,
            weight_decay: 0.0,
        };
        let optimizer = AdamW::new(model.trainable_vars(), params)?;

        Ok(Self { optimizer, steps: 0 })
    }

    /// Forward, MSE, backward and update
    ///
    /// Returns the loss measured before the parameters were updated.
    pub fn train_on_batch(&mut self, model: &Seq2SeqRegressor, x: &Tensor, y: &Tensor) -> Result<f32> {
        let predictions = model.forward(x)?;
        let loss = loss::mse(&predictions, y)?;
        let loss_val = loss.to_scalar::<f32>()?;

        self.optimizer.backward_step(&loss)?;
        self.steps += 1;

        Ok(loss_val)
    }

    /// Forward and MSE only; parameters are left untouched
    pub fn evaluate(model: &Seq2SeqRegressor, x: &Tensor, y: &Tensor) -> Result<f32> {
        let predictions = model.forward(x)?.detach();
        loss::mse(&predictions, y)?.to_scalar::<f32>()
    }

    /// Number of updates applied so far
    pub fn steps(&self) -> usize {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelConfig;
    use candle_core::Device;

    fn model(device: &Device) -> Seq2SeqRegressor {
        let config = ModelConfig {
            n_variables: 2,
            len_input: 6,
            len_prediction: 3,
            hidden_size: 8,
        };
        Seq2SeqRegressor::build(config, device).unwrap()
    }

    fn batch(device: &Device) -> Result<(Tensor, Tensor)> {
        let x = Tensor::randn(0f32, 1.0, (16, 6, 2), device)?;
        let y = (Tensor::randn(0f32, 1.0, (16, 3), device)? + 2.0)?;
        Ok((x, y))
    }

    #[test]
    fn test_evaluate_leaves_parameters_unchanged() -> Result<()> {
        let device = Device::Cpu;
        let model = model(&device);
        let (x, y) = batch(&device)?;

        let before = model.parameter_snapshot()?;
        let loss_a = GradientStep::evaluate(&model, &x, &y)?;
        let loss_b = GradientStep::evaluate(&model, &x, &y)?;

        assert_eq!(before, model.parameter_snapshot()?);
        assert_eq!(loss_a, loss_b);
        Ok(())
    }

    #[test]
    fn test_train_step_changes_parameters() -> Result<()> {
        let device = Device::Cpu;
        let model = model(&device);
        let (x, y) = batch(&device)?;
        let mut step = GradientStep::new(&model, 1e-2)?;

        let before = model.parameter_snapshot()?;
        step.train_on_batch(&model, &x, &y)?;
        let after = model.parameter_snapshot()?;

        assert_ne!(before, after);
        assert_eq!(step.steps(), 1);
        Ok(())
    }

    #[test]
    fn test_reported_loss_is_pre_update() -> Result<()> {
        let device = Device::Cpu;
        let model = model(&device);
        let (x, y) = batch(&device)?;
        let mut step = GradientStep::new(&model, 1e-2)?;

        let expected = GradientStep::evaluate(&model, &x, &y)?;
        let reported = step.train_on_batch(&model, &x, &y)?;

        assert!((expected - reported).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_loss_is_mean_squared_error() -> Result<()> {
        let device = Device::Cpu;
        let model = model(&device);
        let (x, y) = batch(&device)?;

        let predictions = model.forward(&x)?.flatten_all()?.to_vec1::<f32>()?;
        let targets = y.flatten_all()?.to_vec1::<f32>()?;
        let manual = predictions
            .iter()
            .zip(&targets)
            .map(|(p, t)| (p - t) * (p - t))
            .sum::<f32>()
            / predictions.len() as f32;

        let loss = GradientStep::evaluate(&model, &x, &y)?;
        assert!((loss - manual).abs() < 1e-4 * manual.max(1.0));
        Ok(())
    }

    #[test]
    fn test_repeated_steps_fit_fixed_batch() -> Result<()> {
        let device = Device::Cpu;
        let model = model(&device);
        let (x, y) = batch(&device)?;
        let mut step = GradientStep::new(&model, 1e-2)?;

        let initial = GradientStep::evaluate(&model, &x, &y)?;
        for _ in 0..100 {
            step.train_on_batch(&model, &x, &y)?;
        }
        let fitted = GradientStep::evaluate(&model, &x, &y)?;

        assert!(fitted < initial, "loss went from {} to {}", initial, fitted);
        Ok(())
    }
}
