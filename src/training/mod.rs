/// Training infrastructure for the seq2seq regressor
pub mod step;
pub mod trainer;

pub use step::GradientStep;
pub use trainer::{IterationRecord, SkippedFile, Trainer, TrainingReport, VALIDATION_INTERVAL};
