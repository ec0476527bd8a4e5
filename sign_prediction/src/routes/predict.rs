use crate::{
    detector::Detector,
    prediction::{PredictionError, PredictionResult},
    server::SharedState,
};
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    response::Json,
};
use tracing::instrument;

const FILE_FIELD: &str = "file";

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Pulls the image out of a `file` form field, or takes the raw body.
async fn read_image_bytes<D: Detector>(
    request: Request,
    state: &SharedState<D>,
) -> Result<Vec<u8>, PredictionError> {
    if !is_multipart(&request) {
        let body = Bytes::from_request(request, state)
            .await
            .map_err(|e| PredictionError::Request(e.to_string()))?;
        return Ok(body.to_vec());
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| PredictionError::Request(e.to_string()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PredictionError::Request(e.to_string()))?
    {
        if field.name() == Some(FILE_FIELD) || field.file_name().is_some() {
            let data = field
                .bytes()
                .await
                .map_err(|e| PredictionError::Request(e.to_string()))?;
            return Ok(data.to_vec());
        }
    }

    Err(PredictionError::Request(format!(
        "multipart body has no `{}` field",
        FILE_FIELD
    )))
}

#[instrument(skip(state, request))]
pub async fn predict_image<D: Detector>(
    State(state): State<SharedState<D>>,
    request: Request,
) -> Json<PredictionResult> {
    if !state.prediction_service.is_model_loaded() {
        return Json(PredictionError::ModelNotLoaded.into());
    }

    let image_bytes = match read_image_bytes(request, &state).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("Rejected prediction request: {}", err);
            return Json(err.into());
        }
    };

    Json(state.prediction_service.predict(image_bytes).await)
}
