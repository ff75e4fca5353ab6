//! Options for launching a shell

use std::collections::BTreeMap;
use std::path::PathBuf;

/// How a shell process is started
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    /// Pass `-i` to the shell
    pub interactive: bool,

    /// Pass `-l` to the shell
    pub login: bool,

    /// Requested working directory; the home directory is used when it is
    /// unset or unusable
    pub cwd: Option<PathBuf>,

    /// Variables applied on top of the composed environment
    pub env: BTreeMap<String, String>,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn login(mut self, login: bool) -> Self {
        self.login = login;
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Shell flags implied by these options, login first
    pub fn shell_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.login {
            flags.push("-l");
        }
        if self.interactive {
            flags.push("-i");
        }
        flags
    }
}
