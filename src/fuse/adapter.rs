/*!
 * FUSE Adapter
 * Translates kernel file requests into registry, access, and handle calls
 */

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyBmap, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow, FUSE_ROOT_ID,
};
use tracing::{debug, error, info, warn};

use crate::access::{check_open, OpenMode};
use crate::core::{MountIdentity, Principal};
use crate::handle::{CommandStream, Direction, HandleTable};
use crate::metadata::{entry_attributes, root_attributes, Attributes, FileKind};
use crate::registry::{Entry, Registry, Resolved};

/// Attribute and entry cache timeout handed to the kernel. Short, because
/// every read can observe different data.
const TTL: Duration = Duration::from_secs(1);

/// The mounted filesystem: flat inode bookkeeping plus dispatch into the
/// core components. The registry and mount identity are immutable; the
/// handle table is the only mutable state.
pub struct ExecFs {
    registry: Arc<Registry>,
    mount_identity: MountIdentity,
    file_size: u64,
    handles: HandleTable,
}

impl ExecFs {
    #[must_use]
    pub fn new(registry: Arc<Registry>, mount_identity: MountIdentity, file_size: u64) -> Self {
        Self {
            registry,
            mount_identity,
            file_size,
            handles: HandleTable::new(),
        }
    }

    /// Inode scheme: FUSE_ROOT_ID (1) is the root, entry `i` is inode `i + 2`.
    /// This mapping belongs to the transport alone; the core never sees it.
    #[inline]
    const fn entry_ino(index: usize) -> u64 {
        index as u64 + 2
    }

    #[inline]
    const fn entry_index(ino: u64) -> Option<usize> {
        if ino >= 2 {
            Some((ino - 2) as usize)
        } else {
            None
        }
    }

    fn entry_for_ino(&self, ino: u64) -> Option<&Entry> {
        Self::entry_index(ino).and_then(|i| self.registry.get(i))
    }

    /// Whether an inode refers to the root or a configured entry.
    fn ino_resolves(&self, ino: u64) -> bool {
        ino == FUSE_ROOT_ID || self.entry_for_ino(ino).is_some()
    }

    fn attr_for_ino(&self, ino: u64) -> Option<FileAttr> {
        if ino == FUSE_ROOT_ID {
            return Some(self.to_file_attr(ino, &root_attributes(&self.mount_identity)));
        }
        self.entry_for_ino(ino).map(|entry| {
            self.to_file_attr(
                ino,
                &entry_attributes(entry, &self.mount_identity, self.file_size),
            )
        })
    }

    fn to_file_attr(&self, ino: u64, attrs: &Attributes) -> FileAttr {
        FileAttr {
            ino,
            size: attrs.size,
            blocks: 0,
            atime: attrs.timestamp,
            mtime: attrs.timestamp,
            ctime: attrs.timestamp,
            crtime: attrs.timestamp,
            kind: match attrs.kind {
                FileKind::Directory => FileType::Directory,
                FileKind::File => FileType::RegularFile,
            },
            perm: attrs.mode as u16,
            nlink: attrs.nlink,
            uid: attrs.uid,
            gid: attrs.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }
}

impl Filesystem for ExecFs {
    fn init(&mut self, _req: &Request, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        info!(entries = self.registry.len(), "execfs mounted");
        Ok(())
    }

    fn destroy(&mut self) {
        info!(open_handles = self.handles.len(), "execfs unmounted");
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        debug!(parent, ?name, "lookup");
        if parent != FUSE_ROOT_ID {
            // The namespace is flat: nothing resolves below an entry.
            reply.error(libc::ENOENT);
            return;
        }
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.registry.resolve(&format!("/{}", name)) {
            Resolved::Entry { index, entry } => {
                let attr = self.to_file_attr(
                    Self::entry_ino(index),
                    &entry_attributes(entry, &self.mount_identity, self.file_size),
                );
                reply.entry(&TTL, &attr, 0);
            }
            Resolved::Root | Resolved::NotFound => reply.error(libc::ENOENT),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        debug!(ino, "getattr");
        match self.attr_for_ino(ino) {
            Some(attr) => reply.attr(&TTL, &attr),
            None => reply.error(libc::ENOENT),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        debug!(ino, ?mode, ?uid, ?gid, ?size, "setattr");

        // Permission bits and ownership come from the config file, never
        // from runtime mutation.
        if mode.is_some() || uid.is_some() || gid.is_some() {
            reply.error(libc::EACCES);
            return;
        }

        // Truncate and timestamp updates succeed as no-ops once the path
        // resolves; generic tools probe them speculatively.
        match self.attr_for_ino(ino) {
            Some(attr) => reply.attr(&TTL, &attr),
            None => reply.error(libc::ENOENT),
        }
    }

    fn open(&mut self, req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        let Some(entry) = self.entry_for_ino(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let mode = match OpenMode::from_flags(flags) {
            Ok(mode) => mode,
            Err(e) => {
                debug!(ino, flags, error = %e, "open rejected");
                reply.error(e.errno());
                return;
            }
        };

        let principal = Principal::new(req.uid(), req.gid());
        if let Err(e) = check_open(entry, mode, principal, &self.mount_identity) {
            debug!(path = %entry.path, %mode, uid = principal.uid, gid = principal.gid, "open denied");
            reply.error(e.errno());
            return;
        }

        info!(path = %entry.path, command = %entry.command, %mode, "opening");

        // One pipe direction per backing process: only a read-only open
        // captures the child's output, everything else feeds its input.
        let direction = match mode {
            OpenMode::Read => Direction::Read,
            OpenMode::Write | OpenMode::ReadWrite => Direction::Write,
        };

        match CommandStream::spawn(&entry.command, direction) {
            Ok(stream) => {
                let fh = self.handles.insert(stream);
                debug!(path = %entry.path, fh, "opened");
                reply.opened(fh, 0);
            }
            Err(e) => {
                error!(path = %entry.path, command = %entry.command, error = %e, "spawn failed");
                reply.error(e.errno());
            }
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!(ino, fh, offset, size, "read");

        // The backing stream is a sequential pipe; kernel offsets carry no
        // meaning here and are ignored.
        let mut buf = vec![0u8; size as usize];
        let result = self.handles.with_stream(fh, |stream| stream.read(&mut buf));
        match result {
            Some(Ok(n)) => {
                debug!(ino, fh, bytes = n, "read complete");
                reply.data(&buf[..n]);
            }
            Some(Err(e)) => {
                warn!(ino, fh, error = %e, "read failed");
                reply.error(e.errno());
            }
            None => {
                error!(ino, fh, "read on unknown handle");
                reply.error(libc::EBADF);
            }
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        debug!(ino, fh, offset, len = data.len(), "write");

        let result = self.handles.with_stream(fh, |stream| stream.write(data));
        match result {
            Some(Ok(n)) => {
                debug!(ino, fh, bytes = n, "write complete");
                reply.written(n as u32);
            }
            Some(Err(e)) => {
                warn!(ino, fh, error = %e, "write failed");
                reply.error(e.errno());
            }
            None => {
                error!(ino, fh, "write on unknown handle");
                reply.error(libc::EBADF);
            }
        }
    }

    fn flush(&mut self, _req: &Request, ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        debug!(ino, fh, "flush");
        if ino == FUSE_ROOT_ID {
            reply.ok();
            return;
        }
        if self.entry_for_ino(ino).is_none() {
            reply.error(libc::ENOENT);
            return;
        }

        match self.handles.with_stream(fh, |stream| stream.flush()) {
            Some(Ok(())) => reply.ok(),
            Some(Err(e)) => {
                warn!(ino, fh, error = %e, "flush failed");
                reply.error(e.errno());
            }
            None => {
                error!(ino, fh, "flush on unknown handle");
                reply.error(libc::EBADF);
            }
        }
    }

    fn fsync(&mut self, _req: &Request, ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        debug!(ino, fh, datasync, "fsync");
        if ino == FUSE_ROOT_ID {
            reply.ok();
            return;
        }
        if self.entry_for_ino(ino).is_none() {
            reply.error(libc::ENOENT);
            return;
        }

        match self.handles.with_stream(fh, |stream| stream.sync(datasync)) {
            Some(Ok(())) => reply.ok(),
            Some(Err(e)) => {
                warn!(ino, fh, error = %e, "fsync failed");
                reply.error(e.errno());
            }
            None => {
                error!(ino, fh, "fsync on unknown handle");
                reply.error(libc::EBADF);
            }
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        debug!(ino, fh, "release");
        match self.handles.remove(fh) {
            Some(stream) => {
                // The association ends here regardless of how the child went
                // down; its exit status is informational.
                match stream.release() {
                    Ok(code) => debug!(ino, fh, exit = ?code, "released"),
                    Err(e) => warn!(ino, fh, error = %e, "release wait failed"),
                }
                reply.ok();
            }
            None => {
                // The transport guarantees one release per open; a missing
                // handle is an invariant violation, not a user error.
                error!(ino, fh, "release on unknown handle");
                reply.error(libc::EBADF);
            }
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!(ino, offset, "readdir");
        if ino != FUSE_ROOT_ID {
            // No subdirectories exist, so the only listable path is root.
            reply.error(libc::ENOTDIR);
            return;
        }

        let start = offset.max(0) as usize;
        for (index, entry) in self.registry.iter().enumerate().skip(start) {
            // Cookie index + 1 makes repeated calls resume after this entry.
            let full = reply.add(
                Self::entry_ino(index),
                (index + 1) as i64,
                FileType::RegularFile,
                &entry.path,
            );
            if full {
                break;
            }
        }
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        if self.ino_resolves(ino) {
            reply.opened(0, 0);
        } else {
            reply.error(libc::ENOENT);
        }
    }

    fn releasedir(&mut self, _req: &Request, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn fsyncdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        _datasync: bool,
        reply: ReplyEmpty,
    ) {
        if self.ino_resolves(ino) {
            reply.ok();
        } else {
            reply.error(libc::ENOENT);
        }
    }

    // Structural mutation: the namespace is entirely config-defined and
    // immutable at runtime. Edit the config file and remount instead.

    fn mknod(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        debug!(parent, ?name, "mknod rejected");
        reply.error(libc::EACCES);
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        debug!(parent, ?name, "mkdir rejected");
        reply.error(libc::EACCES);
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!(parent, ?name, "unlink rejected");
        reply.error(libc::EACCES);
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!(parent, ?name, "rmdir rejected");
        reply.error(libc::EACCES);
    }

    fn symlink(
        &mut self,
        _req: &Request,
        parent: u64,
        link_name: &OsStr,
        _target: &Path,
        reply: ReplyEntry,
    ) {
        debug!(parent, ?link_name, "symlink rejected");
        reply.error(libc::EACCES);
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        debug!(parent, ?name, "rename rejected");
        reply.error(libc::EACCES);
    }

    fn link(
        &mut self,
        _req: &Request,
        ino: u64,
        _newparent: u64,
        _newname: &OsStr,
        reply: ReplyEntry,
    ) {
        debug!(ino, "link rejected");
        reply.error(libc::EACCES);
    }

    fn readlink(&mut self, _req: &Request, ino: u64, reply: ReplyData) {
        debug!(ino, "readlink rejected");
        reply.error(libc::EACCES);
    }

    fn setxattr(
        &mut self,
        _req: &Request,
        ino: u64,
        name: &OsStr,
        _value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        debug!(ino, ?name, "setxattr rejected");
        reply.error(libc::EACCES);
    }

    fn removexattr(&mut self, _req: &Request, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!(ino, ?name, "removexattr rejected");
        reply.error(libc::EACCES);
    }

    fn bmap(&mut self, _req: &Request, ino: u64, _blocksize: u32, _idx: u64, reply: ReplyBmap) {
        debug!(ino, "bmap rejected");
        reply.error(libc::EACCES);
    }
}
