pub mod cache;
pub mod engine;
pub mod state;

pub use cache::{cache_key, CacheEntry, CacheStore};
pub use engine::{Engine, EngineCommand, EngineSnapshot};
pub use state::{FetchStatus, ParsedFetch, PayloadSource, RestaurantState};
