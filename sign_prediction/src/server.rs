use crate::{
    config::ServerConfig, detector::Detector, prediction::PredictionService, routes::api_routes,
};
use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

pub struct SharedState<D: Detector> {
    pub prediction_service: PredictionService<D>,
    pub service_name: Arc<str>,
}

impl<D: Detector> Clone for SharedState<D> {
    fn clone(&self) -> Self {
        Self {
            prediction_service: self.prediction_service.clone(),
            service_name: self.service_name.clone(),
        }
    }
}

pub fn build_router<D: Detector>(state: SharedState<D>, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(api_routes())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<D: Detector>(
        state: SharedState<D>,
        config: &ServerConfig,
    ) -> anyhow::Result<Self> {
        let addr = config.get_address();
        let router = build_router(state, config.max_body_bytes);
        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model_loader::ModelSlot,
        prediction::tests::{detection, jpeg_bytes, service_with, MockDetector},
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn router_with(prediction_service: PredictionService<MockDetector>) -> Router {
        let state = SharedState {
            prediction_service,
            service_name: Arc::from("Sign Language API"),
        };
        build_router(state, 1024 * 1024)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn multipart_request(field: &str, data: &[u8]) -> Request<Body> {
        let boundary = "sign-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"hand.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::post("/predict")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_reports_running_without_model() {
        let service = PredictionService::<MockDetector>::new(
            Arc::new(ModelSlot::absent()),
            Duration::from_secs(1),
        );

        let (status, body) = send(
            router_with(service),
            Request::get("/").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"status": "ok", "message": "Sign Language API is running"})
        );
    }

    #[tokio::test]
    async fn test_health_reports_model_presence() {
        let (service, _) = service_with(Vec::new());

        let (status, body) = send(
            router_with(service),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "model_loaded": true}));
    }

    #[tokio::test]
    async fn test_predict_multipart_selects_first_tied_detection() {
        let (service, _) = service_with(vec![
            detection("hello", 0.81),
            detection("thanks", 0.81),
        ]);

        let (status, body) = send(
            router_with(service),
            multipart_request("file", &jpeg_bytes()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["label"], "hello");
        assert_eq!(
            body["bbox"],
            json!({"xmin": 12.0, "ymin": 24.0, "xmax": 96.0, "ymax": 120.0})
        );
        assert!((body["confidence"].as_f64().unwrap() - 0.81).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_predict_raw_body_without_detections() {
        let (service, _) = service_with(vec![detection("hello", 0.001)]);
        let request = Request::post("/predict")
            .header(header::CONTENT_TYPE, "image/jpeg")
            .body(Body::from(jpeg_bytes()))
            .unwrap();

        let (status, body) = send(router_with(service), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"label": "No sign detected", "confidence": 0}));
    }

    #[tokio::test]
    async fn test_predict_without_model_is_ok_with_error_body() {
        let service = PredictionService::<MockDetector>::new(
            Arc::new(ModelSlot::absent()),
            Duration::from_secs(1),
        );

        let (status, body) =
            send(router_with(service), multipart_request("file", b"junk")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"error": "Model not loaded"}));
    }

    #[tokio::test]
    async fn test_predict_malformed_image_is_ok_with_error_body() {
        let (service, detector) = service_with(vec![detection("hello", 0.9)]);

        let (status, body) =
            send(router_with(service), multipart_request("file", b"junk")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid image"));
        assert_eq!(detector.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_predict_multipart_without_file_field() {
        let (service, _) = service_with(Vec::new());
        let boundary = "sign-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n--{boundary}--\r\n"
        );
        let request = Request::post("/predict")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(router_with(service), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request"));
    }
}
