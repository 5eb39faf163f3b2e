/*!
 * Configuration
 * Startup configuration: the entry list and the reported file size
 */

use crate::core::{FsError, FsResult};
use crate::registry::Entry;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Reported size of every virtual file when none is configured.
///
/// The true size of a file is unknowable before its command runs, so a
/// single constant is reported for all entries.
pub const DEFAULT_FILE_SIZE: u64 = 4096;

/// Startup configuration, parsed once before the first transport call.
///
/// ```json
/// {
///   "size": 4096,
///   "entries": [
///     { "path": "uptime", "mode": "r--r--r--", "command": "uptime" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Size reported by getattr for every entry.
    #[serde(default = "default_size")]
    pub size: u64,
    pub entries: Vec<Entry>,
}

fn default_size() -> u64 {
    DEFAULT_FILE_SIZE
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> FsResult<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| FsError::from_io(e, format!("read config {}", path.display())))?;
        Self::from_json(&data)
    }

    /// Parse and validate a configuration document.
    pub fn from_json(data: &str) -> FsResult<Self> {
        let config: Config = serde_json::from_str(data)
            .map_err(|e| FsError::InvalidConfig(format!("parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject duplicate entry paths.
    ///
    /// The resolver assumes uniqueness rather than enforcing it, so this is
    /// the only place duplicates can be caught.
    fn validate(&self) -> FsResult<()> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.path.as_str()) {
                return Err(FsError::InvalidConfig(format!(
                    "duplicate entry path {:?}",
                    entry.path
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "size": 512,
        "entries": [
            { "path": "uptime", "mode": "r--r--r--", "command": "uptime" },
            { "path": "sink", "mode": "-w--w----", "command": "cat > /tmp/sink" }
        ]
    }"#;

    #[test]
    fn test_parse_config() {
        let config = Config::from_json(SAMPLE).unwrap();
        assert_eq!(config.size, 512);
        assert_eq!(config.entries.len(), 2);
        assert_eq!(config.entries[0].path, "uptime");
        assert_eq!(config.entries[1].command, "cat > /tmp/sink");
    }

    #[test]
    fn test_size_defaults() {
        let config = Config::from_json(r#"{"entries": []}"#).unwrap();
        assert_eq!(config.size, DEFAULT_FILE_SIZE);
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let doc = r#"{
            "entries": [
                { "path": "x", "mode": "r--------", "command": "true" },
                { "path": "x", "mode": "-w-------", "command": "true" }
            ]
        }"#;
        let err = Config::from_json(doc).unwrap_err();
        assert!(matches!(err, FsError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let doc = r#"{"entries": [], "extra": 1}"#;
        assert!(Config::from_json(doc).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("execfs.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.entries.len(), 2);

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            Config::load(&missing),
            Err(FsError::NotFound(_))
        ));
    }
}
