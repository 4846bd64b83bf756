//! Cache provider implementations

pub mod memory;
pub mod noop;
pub mod redis;

pub use memory::InMemoryCacheService;
pub use noop::NoOpCacheService;
pub use self::redis::RedisCacheService;
