mod scorer;
mod store;

pub use scorer::PageScorer;
pub use store::{CacheStore, UsageStore};
