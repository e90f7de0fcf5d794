/// Dense projection and gate activations
use candle_core::{Result, Tensor};
use candle_nn::{Init, VarBuilder};

/// Logistic sigmoid built from differentiable primitives
pub fn sigmoid(x: &Tensor) -> Result<Tensor> {
    (x.neg()?.exp()? + 1.0)?.recip()
}

/// Fully connected layer `y = x W^T + b`
///
/// Weights use Kaiming normal initialization, bias uniform in `±1/sqrt(in)`,
/// matching candle-nn's `Linear`. Accepts inputs of any rank `[..., in]`.
pub struct Dense {
    weight: Tensor,
    bias: Option<Tensor>,
}

impl Dense {
    /// Create new Dense layer
    ///
    /// # Arguments
    /// * `in_features` - Input dimension
    /// * `out_features` - Output dimension
    /// * `bias` - Whether to include bias
    /// * `vb` - VarBuilder for parameter initialization
    pub fn new(in_features: usize, out_features: usize, bias: bool, vb: VarBuilder) -> Result<Self> {
        let weight = vb.get_with_hints(
            (out_features, in_features),
            "weight",
            candle_nn::init::DEFAULT_KAIMING_NORMAL,
        )?;

        let bias = if bias {
            let bound = 1. / (in_features as f64).sqrt();
            let init_bs = Init::Uniform { lo: -bound, up: bound };
            Some(vb.get_with_hints(out_features, "bias", init_bs)?)
        } else {
            None
        };

        Ok(Self { weight, bias })
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let output = input.broadcast_matmul(&self.weight.t()?)?;
        match &self.bias {
            Some(b) => output.broadcast_add(b),
            None => Ok(output),
        }
    }

    /// Output dimension
    pub fn out_features(&self) -> usize {
        self.weight.dims()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_sigmoid_values() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::new(&[0.0f32, 2.0, -2.0], &device)?;

        let y = sigmoid(&x)?.to_vec1::<f32>()?;

        assert!((y[0] - 0.5).abs() < 1e-6);
        assert!((y[1] - 0.880_797).abs() < 1e-5);
        assert!((y[1] + y[2] - 1.0).abs() < 1e-6);

        Ok(())
    }

    #[test]
    fn test_dense_shapes() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let dense = Dense::new(8, 3, true, vb)?;
        let x = Tensor::randn(0f32, 1.0, (4, 8), &device)?;

        assert_eq!(dense.forward(&x)?.dims(), &[4, 3]);
        assert_eq!(dense.out_features(), 3);
        assert_eq!(varmap.all_vars().len(), 2);

        Ok(())
    }
}
