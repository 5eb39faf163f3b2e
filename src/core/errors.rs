/*!
 * Error Types
 * Structured, type-safe error handling for all filesystem operations
 */

use thiserror::Error;

/// Filesystem operation result
///
/// # Must Use
/// Filesystem operations can fail and must be handled
#[must_use = "filesystem operations can fail and must be handled"]
pub type FsResult<T> = Result<T, FsError>;

/// Filesystem errors
///
/// Every variant carries a context string. All errors are local to a single
/// request; none are fatal to the mounted filesystem itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to spawn backing command: {0}")]
    Spawn(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid handle state: {0}")]
    InvalidState(String),
}

impl FsError {
    /// Convert std::io::Error to FsError with context
    pub fn from_io(e: std::io::Error, context: impl Into<String>) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::NotFound => FsError::NotFound(context.into()),
            ErrorKind::PermissionDenied => FsError::AccessDenied(context.into()),
            _ => FsError::Io(format!("{}: {}", context.into(), e)),
        }
    }

    /// Map to the errno reported through the transport.
    ///
    /// `InvalidState` is an internal invariant violation; callers are expected
    /// to log it before mapping, since EIO is the least-surprising code the
    /// transport can carry for it.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::AccessDenied(_) | FsError::NotSupported(_) => libc::EACCES,
            FsError::NotADirectory(_) => libc::ENOTDIR,
            FsError::Spawn(_) => libc::EBADF,
            FsError::Io(_) | FsError::InvalidState(_) => libc::EIO,
            FsError::InvalidConfig(_) => libc::EINVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(FsError::NotFound("x".into()).errno(), libc::ENOENT);
        assert_eq!(FsError::AccessDenied("x".into()).errno(), libc::EACCES);
        assert_eq!(FsError::NotSupported("x".into()).errno(), libc::EACCES);
        assert_eq!(FsError::NotADirectory("x".into()).errno(), libc::ENOTDIR);
        assert_eq!(FsError::Spawn("x".into()).errno(), libc::EBADF);
        assert_eq!(FsError::Io("x".into()).errno(), libc::EIO);
        assert_eq!(FsError::InvalidState("x".into()).errno(), libc::EIO);
    }

    #[test]
    fn test_from_io() {
        let e = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(
            FsError::from_io(e, "open foo"),
            FsError::NotFound("open foo".to_string())
        );

        let e = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert!(matches!(FsError::from_io(e, "write foo"), FsError::Io(_)));
    }
}
