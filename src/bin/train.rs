/// Training entry point: reads ./config.yaml and trains on ./data_processed/Train
use seq2seq_forecast::data::NpyDirectory;
use seq2seq_forecast::models::{ModelStore, Seq2SeqRegressor};
use seq2seq_forecast::training::Trainer;
use seq2seq_forecast::utils::select_device;
use seq2seq_forecast::TrainingConfig;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Start training pipeline.");

    log::info!("Loading configuration parameters.");
    let config = TrainingConfig::from_file("config.yaml").context("invalid config.yaml")?;

    let device = select_device(config.use_gpu)?;
    log::info!("Using device: {:?}", device);

    // Reuse a saved model with this name, otherwise start fresh
    let store = ModelStore::new(&config.model_dir);
    let model = store.load_or_build(&config.model_name, &device, || {
        Seq2SeqRegressor::build(config.model_config(), &device)
    })?;
    model.log_summary();

    let source = NpyDirectory::new(&config.data_dir);
    let mut trainer = Trainer::new(config, &model)?;

    log::info!("Start training.");
    let report = trainer.run(&model, &source, &store)?;

    if !report.skipped.is_empty() {
        log::warn!("{} file visits were skipped during training", report.skipped.len());
    }

    Ok(())
}
