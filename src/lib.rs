pub mod catalog;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod key_generator;
pub mod metadata;
pub mod middleware;
pub mod models;
pub mod provider;
pub mod rate_limit_config;
pub mod rate_limiter;
pub mod response;
pub mod server;
pub mod state;
pub mod store;
pub mod usage;
pub mod validation;

pub use config::Config;
pub use error::{AppError, ConfigError};
pub use server::{create_app, Server};
pub use state::AppState;
