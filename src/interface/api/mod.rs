//! API interface implementations

pub mod app_state;
pub mod error;
pub mod health;
pub mod llm_websocket;
pub mod metrics_handler;
pub mod router;
pub mod webhook;
pub mod ws_handler;

pub use app_state::AppState;
pub use error::ApiError;
pub use metrics_handler::init_metrics;
pub use router::build_router;
pub use ws_handler::serve_observer;
