// In-memory cache module.
// Keyed entries with per-key expiry, generation timeouts, and single-flight generation.

pub mod entry;
pub mod policy;
pub mod registry;

pub use entry::CacheEntry;
pub use policy::{CachePolicy, FIFTEEN_MINUTES, ONE_DAY, ONE_MINUTE, ONE_YEAR};
pub use registry::{CacheRegistry, CacheStats};
