/*!
 * Handle Table
 * Transport-side bookkeeping of open file handles
 */

use super::stream::CommandStream;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Concurrent map from transport file handles to command streams.
///
/// Each stream sits behind its own mutex: the pipe primitives need exclusive
/// access, and a per-handle lock keeps a hung child from blocking unrelated
/// sessions. Handle numbers start at 1 so 0 never aliases a live handle.
#[derive(Debug)]
pub struct HandleTable {
    streams: DashMap<u64, Mutex<CommandStream>>,
    next_fh: AtomicU64,
}

impl HandleTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            streams: DashMap::new(),
            next_fh: AtomicU64::new(1),
        }
    }

    /// Register a freshly spawned stream and allocate its handle.
    pub fn insert(&self, stream: CommandStream) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.streams.insert(fh, Mutex::new(stream));
        fh
    }

    /// Run an operation against the stream behind `fh`.
    ///
    /// Returns None when the handle is unknown; the caller decides whether
    /// that is an assertion failure or a stale descriptor.
    pub fn with_stream<R>(&self, fh: u64, f: impl FnOnce(&mut CommandStream) -> R) -> Option<R> {
        let entry = self.streams.get(&fh)?;
        let mut stream = entry.lock();
        Some(f(&mut stream))
    }

    /// Remove the stream behind `fh`, handing ownership back for release.
    pub fn remove(&self, fh: u64) -> Option<CommandStream> {
        self.streams.remove(&fh).map(|(_, m)| m.into_inner())
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Direction;

    #[test]
    fn test_insert_and_remove() {
        let table = HandleTable::new();
        assert!(table.is_empty());

        let stream = CommandStream::spawn("true", Direction::Read).unwrap();
        let fh = table.insert(stream);
        assert!(fh >= 1);
        assert_eq!(table.len(), 1);

        let stream = table.remove(fh).unwrap();
        stream.release().unwrap();
        assert!(table.is_empty());

        // Exactly one release per open: the handle is gone now
        assert!(table.remove(fh).is_none());
    }

    #[test]
    fn test_with_stream() {
        let table = HandleTable::new();
        let fh = table.insert(CommandStream::spawn("printf x", Direction::Read).unwrap());

        let mut buf = [0u8; 4];
        let n = table.with_stream(fh, |s| s.read(&mut buf)).unwrap().unwrap();
        assert_eq!(&buf[..n], b"x");

        assert!(table.with_stream(999, |_| ()).is_none());

        table.remove(fh).unwrap().release().unwrap();
    }

    #[test]
    fn test_handles_are_unique() {
        let table = HandleTable::new();
        let a = table.insert(CommandStream::spawn("true", Direction::Read).unwrap());
        let b = table.insert(CommandStream::spawn("true", Direction::Read).unwrap());
        assert_ne!(a, b);
        table.remove(a).unwrap().release().unwrap();
        table.remove(b).unwrap().release().unwrap();
    }
}
