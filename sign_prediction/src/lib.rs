mod labels;
mod ort_service;
mod routes;
mod server;

pub mod app;
pub mod config;
pub mod detector;
pub mod model_loader;
pub mod prediction;

pub use app::start_app;
pub use ort_service::OrtDetector;
