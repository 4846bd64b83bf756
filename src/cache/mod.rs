//! # Analysis Result Cache
//!
//! Content-addressable cache for analysis results, keyed by a SHA-256 digest
//! of the input text.
//!
//! The cache is strictly an optimization. [`AnalysisCache`] never surfaces an
//! error: an unreachable backend, a timeout, an open circuit or a corrupt entry
//! all look like a miss on read and a `false` on write.
//!
//! ## Providers
//!
//! - [`RedisCacheService`]: shared across processes, used in production
//! - [`InMemoryCacheService`]: process-local, used in tests and single-node setups
//! - [`NoOpCacheService`]: stores nothing; the fallback when the backend is down

pub mod errors;
pub mod providers;
pub mod store;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use providers::{InMemoryCacheService, NoOpCacheService, RedisCacheService};
pub use store::{AnalysisCache, CacheStatus};
pub use traits::CacheService;
