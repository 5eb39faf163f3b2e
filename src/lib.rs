/*!
 * execfs Library
 * A flat virtual filesystem whose files are backed by shell commands:
 * reading a file streams its command's output, writing streams into
 * the command's input.
 */

pub mod access;
pub mod config;
pub mod core;
pub mod fuse;
pub mod handle;
pub mod metadata;
pub mod registry;

// Re-exports
pub use config::Config;
pub use core::{FsError, FsResult, MountIdentity, Principal, Rights};
pub use fuse::{mount, ExecFs};
pub use handle::{CommandStream, Direction, HandleTable};
pub use registry::{Entry, PermBits, Registry, Resolved};
