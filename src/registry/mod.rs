/*!
 * Entry Registry
 * Immutable table of configured virtual files and the path resolver
 */

mod entry;

pub use entry::{Entry, PermBits};

/// Result of resolving a request path against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    /// The mount root itself.
    Root,
    /// A configured entry and its position in registry order.
    Entry { index: usize, entry: &'a Entry },
    /// Neither the root nor any entry.
    NotFound,
}

/// Immutable table of configured virtual files.
///
/// Built once at startup and shared by read-only reference; requires no
/// synchronization for concurrent reads. Lookup is a linear scan in
/// configuration order; the table is expected to stay small.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    /// Build a registry from configured entries, preserving order.
    ///
    /// Path uniqueness is the config loader's responsibility; the registry
    /// assumes it. With duplicates, resolution returns the first match.
    #[must_use]
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Resolve a request path to the root, an entry, or nothing.
    ///
    /// Root is recognized by exact match against `/`. Any other path must
    /// begin with `/`; the remainder is compared by exact equality against
    /// each entry's stored path, first match wins. Paths without a leading
    /// `/` come from outside this mount point and never resolve.
    pub fn resolve(&self, path: &str) -> Resolved<'_> {
        if path == "/" {
            return Resolved::Root;
        }
        let Some(name) = path.strip_prefix('/') else {
            return Resolved::NotFound;
        };
        self.find(name)
            .map(|(index, entry)| Resolved::Entry { index, entry })
            .unwrap_or(Resolved::NotFound)
    }

    /// Find an entry by its bare name (no leading `/`).
    pub fn find(&self, name: &str) -> Option<(usize, &Entry)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.path == name)
    }

    /// Get an entry by its position in registry order.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Iterate entries in registry order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Entry> {
        self.entries.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, mode: &str) -> Entry {
        Entry {
            path: path.to_string(),
            perms: PermBits::parse(mode).unwrap(),
            command: format!("echo {}", path),
        }
    }

    fn registry() -> Registry {
        Registry::new(vec![
            entry("uptime", "r--r--r--"),
            entry("sink", "-w--w----"),
            entry("date", "r-xr-x---"),
        ])
    }

    #[test]
    fn test_resolve_root() {
        assert_eq!(registry().resolve("/"), Resolved::Root);
    }

    #[test]
    fn test_resolve_entry() {
        let reg = registry();
        match reg.resolve("/sink") {
            Resolved::Entry { index, entry } => {
                assert_eq!(index, 1);
                assert_eq!(entry.path, "sink");
            }
            other => panic!("expected entry, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_not_found() {
        let reg = registry();
        assert_eq!(reg.resolve("/missing"), Resolved::NotFound);
        // No leading separator: outside this mount point
        assert_eq!(reg.resolve("uptime"), Resolved::NotFound);
        assert_eq!(reg.resolve(""), Resolved::NotFound);
        // Exact equality, not prefix match
        assert_eq!(reg.resolve("/uptime/x"), Resolved::NotFound);
    }

    #[test]
    fn test_first_match_wins() {
        let reg = Registry::new(vec![
            entry("dup", "r--------"),
            entry("dup", "-w-------"),
        ]);
        match reg.resolve("/dup") {
            Resolved::Entry { index, .. } => assert_eq!(index, 0),
            other => panic!("expected entry, got {:?}", other),
        }
    }

    #[test]
    fn test_iteration_order() {
        let reg = registry();
        let names: Vec<&str> = reg.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(names, ["uptime", "sink", "date"]);
        assert_eq!(reg.len(), 3);
        assert!(!reg.is_empty());
    }
}
