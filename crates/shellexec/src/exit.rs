//! Process termination results and exit-status decoding

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use thiserror::Error;

/// Why a process did not finish successfully
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    #[error("exit status {0}")]
    Exited(i32),

    #[error("terminated by signal {signal}")]
    Signaled { signal: i32, core_dumped: bool },

    #[error("waiting for process: {0}")]
    Wait(String),
}

/// Outcome of reaping a process: `Ok` for a zero exit status
pub type ExitResult = Result<(), WaitError>;

impl WaitError {
    /// Numeric exit status, or -1 when the process did not exit normally
    pub fn exit_code(&self) -> i32 {
        match self {
            WaitError::Exited(code) => *code,
            WaitError::Signaled { .. } | WaitError::Wait(_) => -1,
        }
    }
}

/// Map a reaped status onto a termination result
pub fn exit_result(status: ExitStatus) -> ExitResult {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(WaitError::Exited(code));
    }
    if let Some(signal) = status.signal() {
        return Err(WaitError::Signaled {
            signal,
            core_dumped: status.core_dumped(),
        });
    }
    Err(WaitError::Wait(format!("unrecognized wait status {status}")))
}

/// Decode a termination result into an exit code.
///
/// `Ok` is 0, a normal non-zero exit is its status, anything else is -1.
pub fn exit_code(result: &ExitResult) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => err.exit_code(),
    }
}
