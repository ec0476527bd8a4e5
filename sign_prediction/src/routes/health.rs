use crate::{detector::Detector, server::SharedState};
use axum::{extract::State, response::IntoResponse, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Status {
    status: String,
    message: String,
}

#[derive(Serialize, Deserialize)]
pub struct Readiness {
    status: String,
    model_loaded: bool,
}

/// Answers as long as the process is up, with or without a model.
pub async fn root<D: Detector>(State(state): State<SharedState<D>>) -> impl IntoResponse {
    Json(Status {
        status: "ok".into(),
        message: format!("{} is running", state.service_name),
    })
}

pub async fn healthcheck<D: Detector>(State(state): State<SharedState<D>>) -> impl IntoResponse {
    Json(Readiness {
        status: "ok".into(),
        model_loaded: state.prediction_service.is_model_loaded(),
    })
}
