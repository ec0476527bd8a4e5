use clap::Parser;
use sign_pipeline::{config, model_pusher::ModelPusher};
use sign_common::{store::build_store, telemetry};
use std::path::PathBuf;

/// Uploads a trained model artifact to object storage.
#[derive(Parser, Debug)]
#[command(name = "push_model")]
struct Args {
    /// Local artifact to upload, overriding `model_pusher.local_model_path`.
    #[arg(long)]
    model: Option<PathBuf>,
    #[arg(long)]
    bucket: Option<String>,
    #[arg(long)]
    key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::get_configuration()?;
    telemetry::init_subscriber(&config.log_level);

    let mut pusher_config = config.model_pusher.clone();
    if let Some(model) = args.model {
        pusher_config.local_model_path = model;
    }
    if let Some(bucket) = args.bucket {
        pusher_config.bucket = bucket;
    }
    if let Some(key) = args.key {
        pusher_config.key = key;
    }

    let store = build_store(&config.storage).await?;
    ModelPusher::new(store, pusher_config).push().await?;

    println!("UPLOAD SUCCESSFUL");
    Ok(())
}
