//! Scoped silencing of stdout and stderr
//!
//! PDF parsing can print warnings straight to the standard streams. An
//! [`OutputGuard`] points fds 1 and 2 at the null device for as long as it
//! lives and puts them back when dropped, including during unwinding.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

// Only one guard may own the process's output streams at a time.
static OUTPUT_LOCK: Mutex<()> = Mutex::new(());

pub struct OutputGuard {
    _lock: MutexGuard<'static, ()>,
    #[cfg(unix)]
    saved: Option<unix::SavedFds>,
}

impl OutputGuard {
    /// Redirect stdout and stderr to the null device until the guard drops
    ///
    /// If the redirection cannot be set up the guard still holds the lock and
    /// output passes through unchanged.
    pub fn silence() -> Self {
        Self::with_lock(lock_output())
    }

    fn with_lock(lock: MutexGuard<'static, ()>) -> Self {
        // Anything we buffered so far belongs on the real streams.
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();

        Self {
            _lock: lock,
            #[cfg(unix)]
            saved: unix::redirect_to_null(),
        }
    }
}

fn lock_output() -> MutexGuard<'static, ()> {
    OUTPUT_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();

        #[cfg(unix)]
        if let Some(saved) = self.saved.take() {
            unix::restore(saved);
        }
    }
}

#[cfg(unix)]
mod unix {
    use std::fs::OpenOptions;
    use std::os::unix::io::AsRawFd;

    const STDOUT_FD: i32 = libc::STDOUT_FILENO;
    const STDERR_FD: i32 = libc::STDERR_FILENO;

    pub(super) struct SavedFds {
        stdout: i32,
        stderr: i32,
    }

    pub(super) fn redirect_to_null() -> Option<SavedFds> {
        let dev_null = OpenOptions::new().write(true).open("/dev/null").ok()?;

        let stdout = unsafe { libc::dup(STDOUT_FD) };
        if stdout < 0 {
            return None;
        }
        let stderr = unsafe { libc::dup(STDERR_FD) };
        if stderr < 0 {
            unsafe { libc::close(stdout) };
            return None;
        }

        unsafe {
            libc::dup2(dev_null.as_raw_fd(), STDOUT_FD);
            libc::dup2(dev_null.as_raw_fd(), STDERR_FD);
        }

        Some(SavedFds { stdout, stderr })
    }

    pub(super) fn restore(saved: SavedFds) {
        unsafe {
            libc::dup2(saved.stdout, STDOUT_FD);
            libc::close(saved.stdout);
            libc::dup2(saved.stderr, STDERR_FD);
            libc::close(saved.stderr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[cfg(unix)]
    fn fd_identity(fd: i32) -> (u64, u64) {
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::fstat(fd, &mut stat) };
        assert_eq!(rc, 0);
        (stat.st_dev as u64, stat.st_ino as u64)
    }

    // One test owns the process-wide fds; anything the harness prints while
    // the streams are redirected would be lost.
    #[test]
    fn test_guard_lifecycle() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;

            let null = std::fs::metadata("/dev/null").unwrap();
            let null_identity = (null.dev(), null.ino());

            let lock = lock_output();
            let before = (fd_identity(1), fd_identity(2));
            let guard = OutputGuard::with_lock(lock);
            let during = (fd_identity(1), fd_identity(2));
            drop(guard);

            let lock = lock_output();
            let after = (fd_identity(1), fd_identity(2));
            drop(lock);

            assert_eq!(during, (null_identity, null_identity));
            assert_eq!(after, before);
        }

        // Reacquiring after a normal drop
        drop(OutputGuard::silence());
        drop(OutputGuard::silence());

        // Unwinding releases the lock; a second guard would deadlock otherwise
        let result = panic::catch_unwind(|| {
            let _guard = OutputGuard::silence();
            panic!("parser blew up");
        });
        assert!(result.is_err());
        drop(OutputGuard::silence());
    }
}
