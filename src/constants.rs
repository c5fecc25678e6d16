// Constants module - centralized default values for configuration
//
// Defaults used by the configuration layer and the command-line front end.

// =============================================================================
// Input limits
// =============================================================================

/// Default maximum accepted input size (50 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

// =============================================================================
// Output
// =============================================================================

/// Default directory for rendered files
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Infix between the input stem and the random suffix of an output name
pub const OUTPUT_NAME_INFIX: &str = "_watermarked_";

/// Number of hex characters in the random output suffix
pub const OUTPUT_SUFFIX_LEN: usize = 8;

// =============================================================================
// Worker pool
// =============================================================================

/// Pool size multiplier applied to the available parallelism
pub const WORKERS_PER_CORE: usize = 2;

/// Upper bound for an explicitly configured pool size
pub const MAX_WORKERS: usize = 256;

// =============================================================================
// Logging
// =============================================================================

/// Filter used when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "info";
