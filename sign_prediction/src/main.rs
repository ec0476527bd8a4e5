use sign_common::telemetry;
use sign_prediction::{config, start_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_configuration()?;
    telemetry::init_subscriber(&config.log_level);

    start_app(config).await
}
