pub mod app_config;
pub mod database;
pub mod dispatcher;
pub mod handlers;
pub mod observability;

pub use app_config::AppConfig;
pub use database::DatabaseConfig;
pub use dispatcher::DispatcherConfig;
pub use handlers::{EmailHandlerConfig, HandlersConfig, LogFileHandlerConfig};
pub use observability::ObservabilityConfig;
