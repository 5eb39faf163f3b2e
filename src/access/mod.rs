/*!
 * Access Controller
 * Effective rights of a principal against an entry's permission bits
 */

use crate::core::{FsError, FsResult, MountIdentity, Principal, Rights};
use crate::registry::Entry;
use std::fmt;

/// Requested open mode, decoded from the POSIX access-mode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

impl OpenMode {
    /// Decode the O_ACCMODE bits of an open(2) flag word.
    pub fn from_flags(flags: i32) -> FsResult<Self> {
        match flags & libc::O_ACCMODE {
            libc::O_RDONLY => Ok(Self::Read),
            libc::O_WRONLY => Ok(Self::Write),
            libc::O_RDWR => Ok(Self::ReadWrite),
            other => Err(FsError::NotSupported(format!(
                "unrecognized access mode {:#o}",
                other
            ))),
        }
    }

    #[inline]
    #[must_use]
    pub const fn wants_read(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    #[inline]
    #[must_use]
    pub const fn wants_write(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpenMode::Read => write!(f, "read"),
            OpenMode::Write => write!(f, "write"),
            OpenMode::ReadWrite => write!(f, "read/write"),
        }
    }
}

/// Effective rights of `principal` against `entry`, by first matching rule:
/// owner bits if the caller's uid is the mount uid, else group bits if the
/// caller's gid is the mount gid, else other bits.
///
/// Only the single configured gid is consulted; no full group-membership
/// expansion. This is a deliberate, documented limitation of the permission
/// model, not something to silently broaden.
#[must_use]
pub fn rights_for(entry: &Entry, principal: Principal, mount: &MountIdentity) -> Rights {
    if principal.uid == mount.uid {
        entry.perms.owner
    } else if principal.gid == mount.gid {
        entry.perms.group
    } else {
        entry.perms.other
    }
}

/// Validate a requested open mode against the principal's effective rights.
///
/// Fails with AccessDenied if read is requested without the read bit, or
/// write without the write bit. The execute bit affects only reported
/// attributes, never this check.
pub fn check_open(
    entry: &Entry,
    mode: OpenMode,
    principal: Principal,
    mount: &MountIdentity,
) -> FsResult<()> {
    let rights = rights_for(entry, principal, mount);
    if (mode.wants_read() && !rights.read) || (mode.wants_write() && !rights.write) {
        return Err(FsError::AccessDenied(format!(
            "open {:?} for {} (effective rights {})",
            entry.path, mode, rights
        )));
    }
    Ok(())
}
