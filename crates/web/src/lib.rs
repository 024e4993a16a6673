pub mod app;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;
pub mod openapi;
pub mod state;
pub mod voter;

pub use app::router;
pub use state::AppState;
