//! Shell processes on pseudo-terminals
//!
//! Launches a shell bound to a freshly allocated PTY, coordinates forced
//! termination with asynchronous reaping, and runs one-shot commands to
//! completion while capturing everything they write to the terminal.

pub mod completion;
pub mod env;
pub mod exit;
pub mod host;
pub mod launch;
pub mod options;
pub mod proc;
pub mod pty;
mod session;
pub mod size;

pub use completion::Completion;
pub use env::EnvMap;
pub use exit::{exit_code, exit_result, ExitResult, WaitError};
pub use host::{ShellHost, SystemHost, TermDefaults};
pub use launch::Launcher;
pub use options::CommandOptions;
pub use proc::ShellProc;
pub use pty::{Pty, PtyMaster};
pub use size::{PtySize, TermSize};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellExecError {
    #[error("invalid term size: {0}")]
    InvalidSize(TermSize),

    #[error("opening new pty: {0}")]
    Pty(#[source] std::io::Error),

    #[error("starting process: {0}")]
    Start(#[source] std::io::Error),

    #[error(transparent)]
    Exit(#[from] WaitError),

    #[error("pty already closed")]
    PtyClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShellExecError>;
