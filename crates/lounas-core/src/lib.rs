pub mod catalog;
pub mod config;
pub mod dates;
pub mod format;
pub mod model;

pub use catalog::{load_catalog, CatalogError, Provider, RestaurantEntry};
pub use config::{load_app_config, AppConfig, ConfigError};
pub use model::{MenuSection, TodayMenu};
