mod health;
mod predict;

use crate::{detector::Detector, server::SharedState};
use axum::{
    routing::{get, post},
    Router,
};

pub fn api_routes<D: Detector>() -> Router<SharedState<D>> {
    Router::new()
        .route("/", get(health::root::<D>))
        .route("/health", get(health::healthcheck::<D>))
        .route("/predict", post(predict::predict_image::<D>))
}
