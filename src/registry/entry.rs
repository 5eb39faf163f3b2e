/*!
 * Registry Entry
 * A configured virtual file: path, backing command, permission bits
 */

use crate::core::{FsError, Rights};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Nine permission bits, owner/group/other x read/write/execute.
///
/// Deserialized from a 9-character `rwxrwxrwx` string where each position is
/// either the expected letter or `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermBits {
    pub owner: Rights,
    pub group: Rights,
    pub other: Rights,
}

impl PermBits {
    #[inline]
    #[must_use]
    pub const fn new(owner: Rights, group: Rights, other: Rights) -> Self {
        Self {
            owner,
            group,
            other,
        }
    }

    /// Parse a `rwxr-xr--` style mode string with validation.
    pub fn parse(s: &str) -> Result<Self, FsError> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 9 {
            return Err(FsError::InvalidConfig(format!(
                "mode string must be 9 characters, got {:?}",
                s
            )));
        }

        let bit = |index: usize, expected: char| -> Result<bool, FsError> {
            match chars[index] {
                c if c == expected => Ok(true),
                '-' => Ok(false),
                c => Err(FsError::InvalidConfig(format!(
                    "invalid mode character {:?} at position {} in {:?}, expected {:?} or '-'",
                    c, index, s, expected
                ))),
            }
        };

        let triple = |base: usize| -> Result<Rights, FsError> {
            Ok(Rights::new(
                bit(base, 'r')?,
                bit(base + 1, 'w')?,
                bit(base + 2, 'x')?,
            ))
        };

        Ok(Self {
            owner: triple(0)?,
            group: triple(3)?,
            other: triple(6)?,
        })
    }

    /// Map the nine bits to the platform's octal layout (e.g. 0o644).
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.owner.bits() << 6 | self.group.bits() << 3 | self.other.bits()
    }
}

impl fmt::Display for PermBits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", self.owner, self.group, self.other)
    }
}

impl<'de> Deserialize<'de> for PermBits {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A configured virtual file.
///
/// `path` is the name visible in the mount root (unique, no leading `/`);
/// `command` is handed to `/bin/sh -c` when the file is opened. Immutable
/// after registry construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entry {
    #[serde(deserialize_with = "deserialize_entry_path")]
    pub path: String,
    #[serde(rename = "mode")]
    pub perms: PermBits,
    pub command: String,
}

impl Entry {
    /// Validate an entry path: non-empty, no separators, no null bytes.
    pub fn validate_path(path: &str) -> Result<(), FsError> {
        if path.is_empty() {
            return Err(FsError::InvalidConfig(
                "entry path cannot be empty".into(),
            ));
        }
        if path.contains('\0') {
            return Err(FsError::InvalidConfig(
                "entry path cannot contain null bytes".into(),
            ));
        }
        if path.contains('/') {
            return Err(FsError::InvalidConfig(format!(
                "entry path {:?} cannot contain path separators (the namespace is flat)",
                path
            )));
        }
        Ok(())
    }
}

/// Deserialize and validate an entry path
fn deserialize_entry_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let path = String::deserialize(deserializer)?;
    Entry::validate_path(&path).map_err(serde::de::Error::custom)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perm_bits_parse() {
        let perms = PermBits::parse("rw-r--r--").unwrap();
        assert!(perms.owner.read && perms.owner.write && !perms.owner.execute);
        assert!(perms.group.read && !perms.group.write);
        assert!(perms.other.read && !perms.other.write);
        assert_eq!(perms.mode(), 0o644);

        assert_eq!(PermBits::parse("rwxr-xr-x").unwrap().mode(), 0o755);
        assert_eq!(PermBits::parse("---------").unwrap().mode(), 0o000);
        assert_eq!(PermBits::parse("-w--w----").unwrap().mode(), 0o220);
    }

    #[test]
    fn test_perm_bits_parse_rejects() {
        // Wrong length
        assert!(PermBits::parse("rw-").is_err());
        assert!(PermBits::parse("rw-r--r--x").is_err());
        // Letter in the wrong position
        assert!(PermBits::parse("wr-r--r--").is_err());
        assert!(PermBits::parse("rw-r--r-w").is_err());
    }

    #[test]
    fn test_perm_bits_display_roundtrip() {
        let s = "rwxr---w-";
        assert_eq!(PermBits::parse(s).unwrap().to_string(), s);
    }

    #[test]
    fn test_entry_deserialization() {
        let json = r#"{"path": "uptime", "mode": "r--r--r--", "command": "uptime"}"#;
        let entry: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.path, "uptime");
        assert_eq!(entry.command, "uptime");
        assert_eq!(entry.perms.mode(), 0o444);

        // Invalid mode string fails deserialization
        let json = r#"{"path": "uptime", "mode": "banana", "command": "uptime"}"#;
        assert!(serde_json::from_str::<Entry>(json).is_err());

        // Path with a separator fails deserialization
        let json = r#"{"path": "a/b", "mode": "r--r--r--", "command": "uptime"}"#;
        assert!(serde_json::from_str::<Entry>(json).is_err());

        // Empty path fails deserialization
        let json = r#"{"path": "", "mode": "r--r--r--", "command": "uptime"}"#;
        assert!(serde_json::from_str::<Entry>(json).is_err());
    }
}
