/*!
 * FUSE Transport
 * The protocol layer dispatching kernel file requests into the core
 */

mod adapter;

pub use adapter::ExecFs;

use crate::core::{FsError, FsResult};
use fuser::MountOption;
use std::path::Path;

/// Mount the filesystem and serve requests until unmounted.
///
/// Blocks the calling thread for the lifetime of the mount.
pub fn mount(fs: ExecFs, mountpoint: &Path, allow_other: bool, auto_unmount: bool) -> FsResult<()> {
    let mut options = vec![MountOption::FSName("execfs".to_string()), MountOption::NoDev];
    if allow_other {
        options.push(MountOption::AllowOther);
    }
    if auto_unmount {
        options.push(MountOption::AutoUnmount);
    }

    fuser::mount2(fs, mountpoint, &options)
        .map_err(|e| FsError::from_io(e, format!("mount at {}", mountpoint.display())))
}
