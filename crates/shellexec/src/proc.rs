//! A running shell process and its PTY
//!
//! [`ShellProc`] owns the child process and the PTY master for their whole
//! lifetime. A reaper thread started with the process waits for it to
//! terminate, reaps it and publishes the result exactly once; every waiter
//! sees the same value. [`ShellProc::close`] kills the child without waiting.
//! The master descriptor is released once the child has been reaped and
//! the handle has been closed.

use crate::completion::Completion;
use crate::exit::{exit_result, ExitResult, WaitError};
use crate::host::TermDefaults;
use crate::pty::PtyMaster;
use crate::size::{PtySize, TermSize};
use crate::{Result, ShellExecError};
use std::fs::File;
use std::io;
use std::process::Child;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, trace, warn};

/// A shell process bound to a PTY
pub struct ShellProc {
    inner: Arc<Inner>,
    defaults: TermDefaults,
}

struct Inner {
    pid: u32,
    // `Some` until reaped, so a kill through it never reaches a recycled pid
    child: Mutex<Option<Child>>,
    pty: Mutex<PtySlot>,
    closed: Completion<()>,
    done: Completion<ExitResult>,
}

/// The master stays open until the child is reaped and the handle closed
struct PtySlot {
    master: Option<PtyMaster>,
    reaped: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ShellProc {
    /// Take ownership of a started child and start its reaper thread.
    ///
    /// If the reaper cannot be started the child is killed and reaped here.
    pub(crate) fn new(
        child: Child,
        master: PtyMaster,
        defaults: TermDefaults,
    ) -> Result<Self> {
        let pid = child.id();
        let inner = Arc::new(Inner {
            pid,
            child: Mutex::new(Some(child)),
            pty: Mutex::new(PtySlot {
                master: Some(master),
                reaped: false,
            }),
            closed: Completion::new(),
            done: Completion::new(),
        });

        let reaper = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("shellexec-reaper".to_string())
                .spawn(move || inner.run_reaper())
        };
        if let Err(e) = reaper {
            warn!(pid, error = %e, "failed to spawn reaper thread");
            inner.closed.fire(());
            inner.kill();
            inner.reap();
            return Err(ShellExecError::Io(e));
        }

        Ok(Self { inner, defaults })
    }

    /// Get the process ID
    pub fn pid(&self) -> u32 {
        self.inner.pid
    }

    /// Kill the process and release the PTY once it has been reaped.
    ///
    /// Returns without waiting for the process to exit. Only the first call
    /// has any effect; a failed kill is ignored since the process may already
    /// be gone.
    pub fn close(&self) {
        if !self.inner.closed.fire(()) {
            return;
        }
        self.inner.kill();

        let mut pty = lock(&self.inner.pty);
        if pty.reaped {
            self.inner.release_pty(&mut pty);
        }
    }

    /// Record a termination result unless one has been recorded already.
    ///
    /// Returns `true` if this call's result was stored.
    pub fn publish_result(&self, result: ExitResult) -> bool {
        self.inner.publish(result)
    }

    /// Block until a result has been published and return it
    pub fn wait(&self) -> ExitResult {
        self.inner.done.wait().clone()
    }

    /// Wait asynchronously until a result has been published
    pub async fn wait_async(&self) -> ExitResult {
        self.inner.done.wait_async().await.clone()
    }

    /// The published result, or `None` if the process is still being waited on
    pub fn try_wait(&self) -> Option<ExitResult> {
        self.inner.done.get().cloned()
    }

    /// Whether a result has been published
    pub fn is_done(&self) -> bool {
        self.inner.done.is_fired()
    }

    /// Window size currently set on the PTY
    pub fn pty_size(&self) -> Result<PtySize> {
        self.with_pty(|master| master.size().map_err(ShellExecError::Io))
    }

    /// Resize the PTY, substituting defaults for a zero dimension
    pub fn resize(&self, size: TermSize) -> Result<PtySize> {
        let size = size.resolve(&self.defaults)?;
        self.with_pty(|master| master.set_size(size).map_err(ShellExecError::Io))?;
        Ok(size)
    }

    /// Duplicate the PTY master for reading and writing.
    ///
    /// The duplicate stays valid after the handle releases its own
    /// descriptor; reads on it fail once the process is gone.
    pub fn try_clone_pty(&self) -> Result<File> {
        self.with_pty(|master| master.try_clone_file().map_err(ShellExecError::Io))
    }

    fn with_pty<T>(&self, f: impl FnOnce(&PtyMaster) -> Result<T>) -> Result<T> {
        match lock(&self.inner.pty).master.as_ref() {
            Some(master) => f(master),
            None => Err(ShellExecError::PtyClosed),
        }
    }
}

impl Drop for ShellProc {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ShellProc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellProc")
            .field("pid", &self.inner.pid)
            .field("result", &self.inner.done.get())
            .finish()
    }
}

impl Inner {
    fn kill(&self) {
        if let Some(child) = lock(&self.child).as_mut() {
            if let Err(e) = child.kill() {
                debug!(pid = self.pid, error = %e, "kill failed");
            }
        }
    }

    fn run_reaper(&self) {
        if let Err(e) = wait_for_exit(self.pid) {
            // Without a non-reaping wait only a kill may end the process
            debug!(pid = self.pid, error = %e, "cannot watch for exit, reaping on close");
            self.closed.wait();
        }
        self.reap();
    }

    fn reap(&self) {
        let Some(mut child) = lock(&self.child).take() else {
            return;
        };

        let result = match child.wait() {
            Ok(status) => exit_result(status),
            Err(e) => Err(WaitError::Wait(e.to_string())),
        };
        self.publish(result);

        let mut pty = lock(&self.pty);
        pty.reaped = true;
        if self.closed.is_fired() {
            self.release_pty(&mut pty);
        }
    }

    fn release_pty(&self, pty: &mut PtySlot) {
        if let Some(master) = pty.master.take() {
            drop(master);
            trace!(pid = self.pid, "pty released");
        }
    }

    fn publish(&self, result: ExitResult) -> bool {
        let won = self.done.fire(result);
        if won {
            debug!(pid = self.pid, result = ?self.done.get(), "process done");
        }
        won
    }
}

/// Block until `pid` has terminated, leaving it unreaped.
///
/// The zombie keeps the pid reserved until [`Child::wait`] collects it, so
/// a concurrent kill through the `Child` can never hit a recycled pid.
fn wait_for_exit(pid: u32) -> io::Result<()> {
    loop {
        // SAFETY: siginfo_t is plain data and waitid only writes into it.
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let ret = unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOWAIT,
            )
        };
        if ret == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
