//! Constants shared with the instrumentation pass.
//!
//! The instrumentation rewrites the target so that, at runtime, it locates the
//! coverage region named by [`SHARED_MEMORY_ENV`] and writes edge hits into
//! it. The core never interprets the region's contents; only its hash matters.

/// Environment variable holding the coverage region's name.
///
/// The name is the absolute path of the memory-mapped backing file; an
/// instrumented target opens and maps it directly.
pub const SHARED_MEMORY_ENV: &str = "FIZIL_SHARED_MEMORY";

/// Environment variable holding the coverage region's size in bytes.
pub const SHARED_MEMORY_SIZE_ENV: &str = "FIZIL_SHARED_MEMORY_SIZE";

/// Default coverage bitmap size. The real size is an instrumentation
/// contract; projects override it when the target reports a larger map.
pub const DEFAULT_MAP_SIZE: usize = 65536;

/// Exported symbol for an in-process entry point taking `(*const u8, usize)`.
pub const BYTES_ENTRY_POINT: &str = "fizil_test_bytes";

/// Exported symbol for an in-process entry point taking `*const c_char`.
pub const STRING_ENTRY_POINT: &str = "fizil_test_string";
