// Cache policies.
// Each cached source method declares how long its value stays fresh and how
// long a generation may run before callers stop waiting for it.

use std::time::Duration;

pub const ONE_MINUTE: Duration = Duration::from_secs(60);
pub const FIFTEEN_MINUTES: Duration = Duration::from_secs(15 * 60);
pub const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);
pub const ONE_YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Expiry and generation timeout for one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long a stored value is served without regeneration.
    pub expires_in: Duration,
    /// How long callers wait on a generation before falling back.
    pub generate_timeout: Duration,
}

impl CachePolicy {
    pub const fn new(expires_in: Duration, generate_timeout: Duration) -> Self {
        Self {
            expires_in,
            generate_timeout,
        }
    }
}
