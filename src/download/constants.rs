//! Constants for the transfer engine (timeouts, chunking, spooling).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Slice size used when writing the response body into the spool.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Default in-memory ceiling before a transfer spills to disk (16 MiB).
pub const DEFAULT_SPOOL_LIMIT_MB: u64 = 16;

/// Bytes per mebibyte, used for limits and the unknown-length progress heuristic.
pub const MIB: u64 = 1024 * 1024;
