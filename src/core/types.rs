/*!
 * Core Types
 * Caller identity, mount identity, and permission rights
 */

use std::fmt;

/// The (uid, gid) identity attached to one incoming request.
///
/// Supplied per call by the transport, never cached: two requests on the same
/// handle may carry different principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal {
    pub uid: u32,
    pub gid: u32,
}

impl Principal {
    #[inline]
    #[must_use]
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }
}

/// Identity of the mounting process, captured once at startup.
///
/// Every virtual file reports this identity as its owner, regardless of the
/// caller. Immutable for the lifetime of the mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountIdentity {
    pub uid: u32,
    pub gid: u32,
}

impl MountIdentity {
    #[inline]
    #[must_use]
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// Capture the identity of the current process.
    #[must_use]
    pub fn current() -> Self {
        // SAFETY: getuid/getgid cannot fail and have no preconditions.
        let uid = unsafe { libc::getuid() };
        let gid = unsafe { libc::getgid() };
        Self { uid, gid }
    }
}

/// One read/write/execute triple.
///
/// Used both for the stored bits of a configured entry (owner/group/other)
/// and for the effective rights computed for a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rights {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Rights {
    #[inline]
    #[must_use]
    pub const fn new(read: bool, write: bool, execute: bool) -> Self {
        Self {
            read,
            write,
            execute,
        }
    }

    /// Pack into the low three mode bits (r=4, w=2, x=1).
    #[inline]
    #[must_use]
    pub const fn bits(&self) -> u32 {
        (self.read as u32) << 2 | (self.write as u32) << 1 | (self.execute as u32)
    }
}

impl fmt::Display for Rights {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' },
        )
    }
}
