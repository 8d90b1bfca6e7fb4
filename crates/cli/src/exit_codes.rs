//! Structured exit codes for machine-readable error handling.
//!
//! These codes let scripts distinguish a bad query from an unreachable API.

/// Success (standard convention)
pub const SUCCESS: i32 = 0;

/// General error (fallback for unknown and internal errors)
pub const GENERAL_ERROR: i32 = 1;

/// CLI usage error (invalid arguments, missing flags)
pub const USAGE_ERROR: i32 = 2;

/// Configuration error (YAML parse failure, failed validation)
pub const CONFIG_ERROR: i32 = 3;

/// Connection error (API unreachable, timeout, bad status, unreadable response)
pub const CONNECTION_ERROR: i32 = 4;

/// Query error (unsupported predicate on the search column, planning failure)
pub const QUERY_ERROR: i32 = 5;
