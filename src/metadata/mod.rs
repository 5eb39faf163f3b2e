/*!
 * Metadata
 * Attributes reported for the root directory and configured entries
 */

use crate::core::{FsResult, FsError, MountIdentity};
use crate::registry::{Entry, Registry, Resolved};
use std::time::SystemTime;

/// Kind of filesystem object this mount can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    File,
}

/// Transport-independent file attributes.
///
/// Timestamps are always "now": any process reading a virtual file may see
/// different data than last time, so the current time is as good as any.
/// Nothing here is persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attributes {
    pub kind: FileKind,
    /// Permission bits only (no file-type bits).
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub timestamp: SystemTime,
}

impl Attributes {
    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind, FileKind::Directory)
    }
}

/// Attributes of the mount root: a directory readable and searchable by
/// every class, owned by the mounter.
#[must_use]
pub fn root_attributes(mount: &MountIdentity) -> Attributes {
    Attributes {
        kind: FileKind::Directory,
        mode: 0o555,
        nlink: 1,
        uid: mount.uid,
        gid: mount.gid,
        size: 0,
        timestamp: SystemTime::now(),
    }
}

/// Attributes of a configured entry: a regular file whose permission bits
/// map directly from the entry's nine stored bits, owned by the mounter
/// regardless of the caller.
///
/// `size` is the globally configured constant; the true size is unknowable
/// before the backing command runs.
#[must_use]
pub fn entry_attributes(entry: &Entry, mount: &MountIdentity, size: u64) -> Attributes {
    Attributes {
        kind: FileKind::File,
        mode: entry.perms.mode(),
        nlink: 1,
        uid: mount.uid,
        gid: mount.gid,
        size,
        timestamp: SystemTime::now(),
    }
}

/// Attributes for a request path, resolved against the registry.
pub fn attributes(
    registry: &Registry,
    mount: &MountIdentity,
    size: u64,
    path: &str,
) -> FsResult<Attributes> {
    match registry.resolve(path) {
        Resolved::Root => Ok(root_attributes(mount)),
        Resolved::Entry { entry, .. } => Ok(entry_attributes(entry, mount, size)),
        Resolved::NotFound => Err(FsError::NotFound(format!("getattr {}", path))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PermBits;

    const MOUNT: MountIdentity = MountIdentity::new(42, 43);

    fn registry() -> Registry {
        Registry::new(vec![Entry {
            path: "uptime".to_string(),
            perms: PermBits::parse("r-xrw---x").unwrap(),
            command: "uptime".to_string(),
        }])
    }

    #[test]
    fn test_root_attributes() {
        let attrs = attributes(&registry(), &MOUNT, 4096, "/").unwrap();
        assert!(attrs.is_dir());
        assert_eq!(attrs.mode, 0o555);
        assert_eq!(attrs.nlink, 1);
        assert_eq!(attrs.uid, 42);
        assert_eq!(attrs.gid, 43);
        assert_eq!(attrs.size, 0);
    }

    #[test]
    fn test_entry_attributes_map_stored_bits() {
        let attrs = attributes(&registry(), &MOUNT, 4096, "/uptime").unwrap();
        assert_eq!(attrs.kind, FileKind::File);
        assert_eq!(attrs.mode, 0o561);
        assert_eq!(attrs.size, 4096);
        // Owner is the mounter, never the caller
        assert_eq!((attrs.uid, attrs.gid), (42, 43));
    }

    #[test]
    fn test_unknown_path_not_found() {
        assert!(matches!(
            attributes(&registry(), &MOUNT, 4096, "/missing"),
            Err(FsError::NotFound(_))
        ));
    }
}
