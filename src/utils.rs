/// Process-level helpers for the training binary
use candle_core::Device;

/// Pick the compute device once at startup
///
/// `use_gpu` asks for CUDA device 0; without CUDA support the run falls back
/// to the CPU with a warning instead of failing.
pub fn select_device(use_gpu: bool) -> candle_core::Result<Device> {
    if !use_gpu {
        return Ok(Device::Cpu);
    }

    if candle_core::utils::cuda_is_available() {
        log::info!("Setting GPU configurations: using CUDA device 0");
        Device::new_cuda(0)
    } else {
        log::warn!("use_gpu is set but CUDA is not available, falling back to CPU");
        Ok(Device::Cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_when_gpu_not_requested() -> candle_core::Result<()> {
        assert!(matches!(select_device(false)?, Device::Cpu));
        Ok(())
    }
}
