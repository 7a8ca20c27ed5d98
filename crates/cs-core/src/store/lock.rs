//! Per-document reader-writer locks with bounded waits.
//!
//! Unlike `std::sync::RwLock`, these locks are counters, not owned guards:
//! release is checked only against the current mode, never against the
//! caller that acquired. Any caller may release a lock held in the right
//! mode. Call sites that acquire on one thread and release on another
//! depend on this.
//!
//! There is no upgrade path and no fairness between waiting readers and
//! writers beyond what `parking_lot::Condvar` wake-ups give.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cs_common::LockMode;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;

/// Upper bound applied when `now + timeout` would overflow `Instant`.
const MAX_WAIT: Duration = Duration::from_secs(365 * 24 * 3600);

/// Current holders of a document lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockState {
    pub readers: usize,
    pub writer: bool,
}

impl LockState {
    pub fn is_free(&self) -> bool {
        self.readers == 0 && !self.writer
    }
}

/// Receipt for a successful acquisition. Dropping it does not release the
/// lock; use [`Store::release_read`](crate::Store::release_read) /
/// [`Store::release_write`](crate::Store::release_write) or the RAII guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTicket {
    pub document: String,
    pub mode: LockMode,
    /// How long the caller blocked before getting the lock.
    pub waited: Duration,
}

/// Many-readers-or-one-writer lock with timed acquisition.
#[derive(Debug, Default)]
pub struct DocumentLock {
    state: Mutex<LockState>,
    changed: Condvar,
}

impl DocumentLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a read lock, waiting at most `timeout` for a writer to leave.
    pub fn try_read_for(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        let mut state = self.state.lock();
        while state.writer {
            if self.changed.wait_until(&mut state, deadline).timed_out() && state.writer {
                return false;
            }
        }
        state.readers += 1;
        true
    }

    /// Take the write lock, waiting at most `timeout` for every holder to leave.
    pub fn try_write_for(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        let mut state = self.state.lock();
        while !state.is_free() {
            if self.changed.wait_until(&mut state, deadline).timed_out() && !state.is_free() {
                return false;
            }
        }
        state.writer = true;
        true
    }

    pub fn try_acquire_for(&self, mode: LockMode, timeout: Duration) -> bool {
        match mode {
            LockMode::Read => self.try_read_for(timeout),
            LockMode::Write => self.try_write_for(timeout),
        }
    }

    /// Drop one reader. Returns `false` when no reader holds the lock.
    pub fn release_read(&self) -> bool {
        let mut state = self.state.lock();
        if state.readers == 0 {
            return false;
        }
        state.readers -= 1;
        if state.readers == 0 {
            self.changed.notify_all();
        }
        true
    }

    /// Drop the writer. Returns `false` when no writer holds the lock.
    pub fn release_write(&self) -> bool {
        let mut state = self.state.lock();
        if !state.writer {
            return false;
        }
        state.writer = false;
        self.changed.notify_all();
        true
    }

    pub fn release(&self, mode: LockMode) -> bool {
        match mode {
            LockMode::Read => self.release_read(),
            LockMode::Write => self.release_write(),
        }
    }

    pub fn state(&self) -> LockState {
        *self.state.lock()
    }

    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + MAX_WAIT)
}

/// Read lock released on drop.
#[derive(Debug)]
pub struct ReadGuard {
    lock: Arc<DocumentLock>,
    document: String,
}

impl ReadGuard {
    pub(crate) fn new(lock: Arc<DocumentLock>, document: impl Into<String>) -> Self {
        ReadGuard {
            lock,
            document: document.into(),
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        if !self.lock.release_read() {
            tracing::debug!(document = %self.document, "read lock already released");
        }
    }
}

/// Write lock released on drop.
#[derive(Debug)]
pub struct WriteGuard {
    lock: Arc<DocumentLock>,
    document: String,
}

impl WriteGuard {
    pub(crate) fn new(lock: Arc<DocumentLock>, document: impl Into<String>) -> Self {
        WriteGuard {
            lock,
            document: document.into(),
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        if !self.lock.release_write() {
            tracing::debug!(document = %self.document, "write lock already released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn test_readers_share() {
        let lock = DocumentLock::new();
        assert!(lock.try_read_for(SHORT));
        assert!(lock.try_read_for(SHORT));
        assert_eq!(
            lock.state(),
            LockState {
                readers: 2,
                writer: false
            }
        );
    }

    #[test]
    fn test_writer_excludes_everyone() {
        let lock = DocumentLock::new();
        assert!(lock.try_write_for(SHORT));
        assert!(!lock.try_read_for(SHORT));
        assert!(!lock.try_write_for(SHORT));
        assert!(lock.release_write());
        assert!(lock.try_read_for(SHORT));
        assert!(!lock.try_write_for(Duration::ZERO));
    }

    #[test]
    fn test_release_without_holder_is_noop() {
        let lock = DocumentLock::new();
        assert!(!lock.release_read());
        assert!(!lock.release_write());
        assert!(lock.try_read_for(SHORT));
        // Holding a read lock does not make a write release succeed
        assert!(!lock.release_write());
        assert!(lock.release_read());
        assert!(lock.state().is_free());
    }

    #[test]
    fn test_cross_thread_release() {
        let lock = Arc::new(DocumentLock::new());
        assert!(lock.try_write_for(SHORT));
        let other = Arc::clone(&lock);
        let released = thread::spawn(move || other.release_write()).join().unwrap();
        assert!(released);
        assert!(lock.state().is_free());
    }

    #[test]
    fn test_writer_wakes_when_reader_leaves() {
        let lock = Arc::new(DocumentLock::new());
        assert!(lock.try_read_for(SHORT));

        let writer_lock = Arc::clone(&lock);
        let writer = thread::spawn(move || writer_lock.try_write_for(Duration::from_secs(5)));

        thread::sleep(Duration::from_millis(50));
        assert!(lock.release_read());
        assert!(writer.join().unwrap());
        assert!(lock.is_write_locked());
    }

    #[test]
    fn test_guards_release_on_drop() {
        let lock = Arc::new(DocumentLock::new());
        {
            assert!(lock.try_read_for(SHORT));
            let _guard = ReadGuard::new(Arc::clone(&lock), "cfg");
            assert_eq!(lock.state().readers, 1);
        }
        assert!(lock.state().is_free());
        {
            assert!(lock.try_write_for(SHORT));
            let guard = WriteGuard::new(Arc::clone(&lock), "cfg");
            assert_eq!(guard.document(), "cfg");
        }
        assert!(lock.state().is_free());
    }

    #[test]
    fn test_huge_timeout_does_not_overflow() {
        let lock = DocumentLock::new();
        assert!(lock.try_write_for(Duration::MAX));
    }
}
