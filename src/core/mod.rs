/*!
 * Core Module
 * Fundamental types and error handling
 */

pub mod errors;
pub mod types;

// Re-export for convenience
pub use errors::{FsError, FsResult};
pub use types::{MountIdentity, Principal, Rights};
