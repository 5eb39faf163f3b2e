/*!
 * Command Stream
 * One backing child process and one pipe direction per open file
 */

use crate::core::{FsError, FsResult};
use std::fmt;
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

/// Which side of the backing process the stream captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The child's stdout is piped to us (file opened read-only).
    Read,
    /// The child's stdin is piped from us (file opened for writing).
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Read => write!(f, "read"),
            Direction::Write => write!(f, "write"),
        }
    }
}

/// The live association between one open virtual file and its backing
/// command process.
///
/// Created on open, exclusively owned by that session, destroyed on release.
/// Exactly one pipe side is held for the whole open-to-release interval; the
/// opposite direction fails with the assertion-class error rather than being
/// silently supported.
///
/// The child is reaped on every exit path (release or drop), so a backing
/// process cannot leak even when an operation fails mid-session.
#[derive(Debug)]
pub struct CommandStream {
    child: Child,
    stdout: Option<ChildStdout>,
    stdin: Option<ChildStdin>,
    command: String,
    direction: Direction,
}

impl CommandStream {
    /// Spawn `command` via `/bin/sh -c` with the pipe side matching
    /// `direction`; the remaining streams stay inherited, as popen leaves
    /// them. Spawn failure surfaces as `FsError::Spawn`.
    pub fn spawn(command: &str, direction: Direction) -> FsResult<Self> {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command);
        match direction {
            Direction::Read => {
                cmd.stdin(Stdio::null()).stdout(Stdio::piped());
            }
            Direction::Write => {
                cmd.stdin(Stdio::piped());
            }
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| FsError::Spawn(format!("{}: {}", command, e)))?;

        let mut stream = Self {
            stdout: child.stdout.take(),
            stdin: child.stdin.take(),
            child,
            command: command.to_string(),
            direction,
        };

        let captured = match direction {
            Direction::Read => stream.stdout.is_some(),
            Direction::Write => stream.stdin.is_some(),
        };
        if !captured {
            // Dropping `stream` reaps the child.
            return Err(FsError::Spawn(format!(
                "{}: {} pipe was not captured",
                stream.command, direction
            )));
        }

        debug!(
            command = %stream.command,
            direction = %direction,
            pid = stream.child.id(),
            "spawned backing process"
        );
        Ok(stream)
    }

    /// Blocking read from the child's stdout.
    ///
    /// Short reads are returned freely; zero signals end-of-stream and is
    /// not an error. No buffering or retry beyond the pipe itself.
    pub fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        let stdout = self.stdout.as_mut().ok_or_else(|| {
            FsError::InvalidState(format!("read on a {}-direction handle", self.direction))
        })?;
        stdout
            .read(buf)
            .map_err(|e| FsError::Io(format!("read from {}: {}", self.command, e)))
    }

    /// Blocking write to the child's stdin.
    ///
    /// Returns the count actually accepted by the pipe, which may be short.
    /// A child that has already exited breaks the pipe and fails here.
    pub fn write(&mut self, data: &[u8]) -> FsResult<usize> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            FsError::InvalidState(format!("write on a {}-direction handle", self.direction))
        })?;
        stdin
            .write(data)
            .map_err(|e| FsError::Io(format!("write to {}: {}", self.command, e)))
    }

    /// Force delivery of buffered output to the backing stream.
    ///
    /// Pipes carry no userspace buffer, so this only forwards the flush;
    /// read-direction streams have nothing to deliver.
    pub fn flush(&mut self) -> FsResult<()> {
        if let Some(stdin) = self.stdin.as_mut() {
            stdin
                .flush()
                .map_err(|e| FsError::Io(format!("flush to {}: {}", self.command, e)))?;
        }
        Ok(())
    }

    /// Request OS-level sync of the pipe descriptor.
    ///
    /// Pipes report EINVAL for fsync; that is not a proxy failure and is
    /// treated as success so generic tools keep working.
    pub fn sync(&mut self, datasync: bool) -> FsResult<()> {
        let fd = match (&self.stdout, &self.stdin) {
            (Some(out), _) => out.as_raw_fd(),
            (None, Some(inp)) => inp.as_raw_fd(),
            (None, None) => {
                return Err(FsError::InvalidState("sync on a released handle".into()))
            }
        };

        // SAFETY: fd is owned by this stream and stays open for the call.
        let rc = unsafe {
            if datasync {
                libc::fdatasync(fd)
            } else {
                libc::fsync(fd)
            }
        };
        if rc != 0 {
            let e = std::io::Error::last_os_error();
            if e.raw_os_error() == Some(libc::EINVAL) {
                return Ok(());
            }
            return Err(FsError::Io(format!("fsync {}: {}", self.command, e)));
        }
        Ok(())
    }

    /// Terminate the association: close the owned pipe end, then wait for
    /// the child. Closing stdin first is what delivers end-of-input to a
    /// write-direction child.
    ///
    /// Returns the child's exit code when it exited normally.
    pub fn release(mut self) -> FsResult<Option<i32>> {
        self.stdin.take();
        self.stdout.take();
        let status = self
            .child
            .wait()
            .map_err(|e| FsError::Io(format!("wait for {}: {}", self.command, e)))?;
        debug!(command = %self.command, status = ?status.code(), "released backing process");
        Ok(status.code())
    }

    /// The pipe direction this stream was opened with.
    #[inline]
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// The backing command line, for logging.
    #[inline]
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Drop for CommandStream {
    fn drop(&mut self) {
        self.stdin.take();
        self.stdout.take();
        // Reap unless release() already waited.
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                if let Err(e) = self.child.wait() {
                    warn!(command = %self.command, error = %e, "failed to reap backing process");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_to_end_of_stream() {
        let mut stream = CommandStream::spawn("printf 'hello\\n'", Direction::Read).unwrap();
        let mut buf = [0u8; 64];
        let mut collected = Vec::new();
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"hello\n");

        // End-of-stream repeats, still not an error
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert_eq!(stream.release().unwrap(), Some(0));
    }

    #[test]
    fn test_write_delivered_on_release() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("sink");
        let command = format!("cat > {}", target.display());

        let mut stream = CommandStream::spawn(&command, Direction::Write).unwrap();
        let n = stream.write(b"payload").unwrap();
        assert_eq!(n, 7);
        stream.flush().unwrap();
        stream.release().unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
    }

    #[test]
    fn test_wrong_direction_is_invalid_state() {
        let mut stream = CommandStream::spawn("true", Direction::Read).unwrap();
        assert!(matches!(
            stream.write(b"x"),
            Err(FsError::InvalidState(_))
        ));

        let mut stream = CommandStream::spawn("cat > /dev/null", Direction::Write).unwrap();
        let mut buf = [0u8; 8];
        assert!(matches!(
            stream.read(&mut buf),
            Err(FsError::InvalidState(_))
        ));
    }

    #[test]
    fn test_sync_on_pipe_is_accepted() {
        let mut stream = CommandStream::spawn("cat > /dev/null", Direction::Write).unwrap();
        stream.sync(false).unwrap();
        stream.sync(true).unwrap();
        stream.release().unwrap();
    }

    #[test]
    fn test_missing_inner_command_reads_as_empty() {
        // /bin/sh spawns fine even when the command does not exist (popen
        // semantics); the reader just sees end-of-stream.
        let mut stream =
            CommandStream::spawn("definitely-not-a-command 2>/dev/null", Direction::Read).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        let code = stream.release().unwrap();
        assert_ne!(code, Some(0));
    }
}
