//! Constants for the fetch layer (timeouts).

use std::time::Duration;

/// Default HTTP connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound on a single resource fetch, end to end.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(120);
