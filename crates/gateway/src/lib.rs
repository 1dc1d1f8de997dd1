pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod sink;
pub mod state;

pub use routes::app;
pub use state::AppState;
