//! Shared constants for scan handling and catalog access.

/// Required length of a catalog barcode.
pub const BARCODE_LENGTH: usize = 13;

/// Prefix every catalog barcode starts with.
pub const BARCODE_PREFIX: &str = "69";

/// Default minimum gap between two decode attempts (ms).
pub const DEFAULT_THROTTLE_MS: u64 = 300;

/// Lower bound for the decode throttle (ms).
pub const MIN_THROTTLE_MS: u64 = 300;

/// Upper bound for the decode throttle (ms).
pub const MAX_THROTTLE_MS: u64 = 500;

/// How long a coordinator ignores further scans after accepting one (ms).
pub const DEFAULT_GUARD_MS: u64 = 1000;

/// Default delay before an automatic submit fires (ms).
pub const DEFAULT_AUTO_SUBMIT_MS: u64 = 900;

/// Lower bound for the auto-submit delay (ms).
pub const MIN_AUTO_SUBMIT_MS: u64 = 800;

/// Upper bound for the auto-submit delay (ms).
pub const MAX_AUTO_SUBMIT_MS: u64 = 1000;

/// Request timeout for catalog calls (ms).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Catalog address used when nothing has been configured.
pub const DEFAULT_SERVER_ADDRESS: &str = "http://10.0.2.2:5000/";

/// Quantity used when the quantity field is left blank.
pub const DEFAULT_QUANTITY: u32 = 1;
