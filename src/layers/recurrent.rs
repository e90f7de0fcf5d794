/// Gated recurrent unit encoder
///
/// Unrolled step by step with plain tensor ops so gradients flow through
/// candle's autodiff without custom kernels.
use candle_core::{Result, Tensor};
use candle_nn::VarBuilder;

use super::activations::{sigmoid, Dense};

/// Single GRU cell
///
/// ```text
/// z  = σ(W_z x + U_z h)
/// r  = σ(W_r x + U_r h)
/// n  = tanh(W_n x + r ⊙ (U_n h))
/// h' = n + z ⊙ (h - n)
/// ```
pub struct GruCell {
    input_proj: Dense,
    hidden_proj: Dense,
    hidden_size: usize,
}

impl GruCell {
    pub fn new(input_size: usize, hidden_size: usize, vb: VarBuilder) -> Result<Self> {
        let input_proj = Dense::new(input_size, 3 * hidden_size, true, vb.pp("input_proj"))?;
        let hidden_proj = Dense::new(hidden_size, 3 * hidden_size, true, vb.pp("hidden_proj"))?;
        Ok(Self {
            input_proj,
            hidden_proj,
            hidden_size,
        })
    }

    /// Advance one step
    ///
    /// # Arguments
    /// * `x` - Input at this step `[batch, input_size]`
    /// * `h` - Previous state `[batch, hidden_size]`
    pub fn step(&self, x: &Tensor, h: &Tensor) -> Result<Tensor> {
        let hs = self.hidden_size;
        let gx = self.input_proj.forward(x)?;
        let gh = self.hidden_proj.forward(h)?;

        let z = sigmoid(&(gx.narrow(1, 0, hs)? + gh.narrow(1, 0, hs)?)?)?;
        let r = sigmoid(&(gx.narrow(1, hs, hs)? + gh.narrow(1, hs, hs)?)?)?;
        let n = (gx.narrow(1, 2 * hs, hs)? + (r * gh.narrow(1, 2 * hs, hs)?)?)?.tanh()?;

        &n + (z * (h - &n)?)?
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

/// Runs a GRU over a whole sequence and returns the last hidden state
pub struct GruEncoder {
    cell: GruCell,
}

impl GruEncoder {
    pub fn new(input_size: usize, hidden_size: usize, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            cell: GruCell::new(input_size, hidden_size, vb.pp("cell"))?,
        })
    }

    /// Encode `[batch, seq_len, input_size]` into `[batch, hidden_size]`
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let (batch_size, seq_len, _) = xs.dims3()?;
        let mut h = Tensor::zeros((batch_size, self.cell.hidden_size()), xs.dtype(), xs.device())?;

        for t in 0..seq_len {
            let x_t = xs.narrow(1, t, 1)?.squeeze(1)?.contiguous()?;
            h = self.cell.step(&x_t, &h)?;
        }

        Ok(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_encoder_output_shape() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let encoder = GruEncoder::new(3, 16, vb)?;
        let xs = Tensor::randn(0f32, 1.0, (4, 12, 3), &device)?;

        assert_eq!(encoder.forward(&xs)?.dims(), &[4, 16]);

        Ok(())
    }

    #[test]
    fn test_hidden_state_is_bounded() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let encoder = GruEncoder::new(2, 8, vb)?;
        let xs = (Tensor::randn(0f32, 1.0, (2, 30, 2), &device)? * 100.0)?;

        let h = encoder.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;

        // Convex mix of tanh outputs stays in [-1, 1]
        assert!(h.iter().all(|v| v.abs() <= 1.0 + 1e-5));

        Ok(())
    }
}
