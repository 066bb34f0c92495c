pub mod aggregate;
pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod state;
pub mod store;
pub mod submission;
pub mod sync;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
