mod memory;

pub use memory::{MemoryCacheStore, MemoryUsageStore};
