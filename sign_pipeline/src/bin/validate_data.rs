use clap::Parser;
use sign_pipeline::{config, data_validation::DataValidation};
use sign_common::telemetry;
use std::path::PathBuf;

/// Checks the ingested feature store before training starts.
#[derive(Parser, Debug)]
#[command(name = "validate_data")]
struct Args {
    /// Feature store directory, overriding `data_validation.feature_store_dir`.
    #[arg(long)]
    feature_store: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::get_configuration()?;
    telemetry::init_subscriber(&config.log_level);

    let mut validation_config = config.data_validation.clone();
    if let Some(feature_store) = args.feature_store {
        validation_config.feature_store_dir = feature_store;
    }

    let artifact = DataValidation::new(validation_config).initiate_data_validation()?;
    anyhow::ensure!(
        artifact.validation_status,
        "data validation failed, missing: {}",
        artifact.missing_files.join(", ")
    );

    Ok(())
}
