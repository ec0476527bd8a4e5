pub mod config;
pub mod data_validation;
pub mod model_pusher;
