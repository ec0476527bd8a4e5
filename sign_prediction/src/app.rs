use crate::{
    config::{Config, SourceKind},
    model_loader::{LoadError, ModelLoader, ModelSlot, ModelSource, OrtDetectorFactory},
    ort_service::OrtDetector,
    prediction::PredictionService,
    server::{HttpServer, SharedState},
};
use sign_common::store::build_store;
use std::{sync::Arc, time::Duration};
use tokio::{signal, sync::broadcast};

async fn prepare_loader(
    config: &Config,
) -> Result<(ModelSource, ModelLoader<OrtDetectorFactory>), LoadError> {
    let source = ModelSource::from_config(&config.model)?;
    let store = match config.model.source {
        SourceKind::Remote => Some(build_store(&config.storage).await?),
        SourceKind::Local => None,
    };
    let factory = OrtDetectorFactory::new(&config.model, &config.inference);

    Ok((
        source,
        ModelLoader::new(store, factory, config.inference.params()),
    ))
}

/// Runs the one-shot model initialization. Never fails the process: any
/// problem is logged and the returned slot holds no model.
pub async fn load_model(config: &Config) -> Arc<ModelSlot<OrtDetector>> {
    let slot = Arc::new(ModelSlot::new());

    let initialized = match prepare_loader(config).await {
        Ok((source, loader)) => loader.initialize(&slot, &source).await,
        Err(e) => {
            tracing::error!("Model loading failed: {}", e);
            slot.initialize(None)
        }
    };
    if let Err(e) = initialized {
        tracing::error!("Model slot initialization failed: {}", e);
    }

    if slot.get().is_some() {
        tracing::info!("Model ready, starting API server");
    } else {
        tracing::warn!("Serving without a model; /predict will report it as not loaded");
    }

    slot
}

pub async fn start_app(config: Config) -> anyhow::Result<()> {
    let slot = load_model(&config).await;
    let prediction_service =
        PredictionService::new(slot, Duration::from_millis(config.inference.timeout_ms));

    let state = SharedState {
        prediction_service,
        service_name: Arc::from(config.service_name.as_str()),
    };
    let server = HttpServer::new(state, &config.server).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    server_handle.await??;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
