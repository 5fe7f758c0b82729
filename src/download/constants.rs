//! Constants for the download module (timeouts, concurrency bounds).

/// Default TCP/TLS connect timeout in milliseconds.
pub const CONNECT_TIMEOUT_MS: u64 = 1_000;

/// Default in-flight request timeout in milliseconds (waiting for response headers).
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default body completion deadline in milliseconds, counted once streaming begins.
pub const BODY_TIMEOUT_MS: u64 = 1_000;

/// Default number of downloads in flight.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Upper bound for the bounded-concurrency mode.
pub const MAX_CONCURRENCY: usize = 16;
