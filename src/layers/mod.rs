/// Neural network layer primitives
///
/// Building blocks for the sequence-to-sequence regressor:
/// - Dense projections and gate activations
/// - GRU cell and sequence encoder

pub mod activations;
pub mod recurrent;

pub use activations::{sigmoid, Dense};
pub use recurrent::{GruCell, GruEncoder};
