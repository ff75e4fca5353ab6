//! Host-provided collaborators: shell discovery, terminal defaults,
//! baseline environment and home directory.

use nix::unistd::{Uid, User};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_TERM_ROWS: i32 = 25;
pub const DEFAULT_TERM_COLS: i32 = 80;
pub const DEFAULT_TERM_TYPE: &str = "xterm-256color";
pub const DEFAULT_LANG: &str = "en_US.UTF-8";

/// Size and type a terminal gets when the caller does not specify one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermDefaults {
    pub rows: i32,
    pub cols: i32,
    pub term_type: String,
}

impl Default for TermDefaults {
    fn default() -> Self {
        Self {
            rows: DEFAULT_TERM_ROWS,
            cols: DEFAULT_TERM_COLS,
            term_type: DEFAULT_TERM_TYPE.to_string(),
        }
    }
}

/// Everything the launcher needs to know about the machine it runs on
pub trait ShellHost: Send + Sync {
    /// Absolute path to a login shell
    fn shell_path(&self) -> PathBuf;

    /// Fallback terminal size and type
    fn term_defaults(&self) -> TermDefaults;

    /// Baseline variables injected into every child for the given terminal type
    fn env_vars(&self, term_type: &str) -> BTreeMap<String, String>;

    /// Locale used when the environment has no `LANG`
    fn lang(&self) -> String;

    /// Working directory used when the requested one is unusable
    fn home_dir(&self) -> PathBuf;
}

/// `ShellHost` backed by the current user's account and environment
#[derive(Debug, Clone, Default)]
pub struct SystemHost {
    shell: Option<PathBuf>,
    home: Option<PathBuf>,
    lang: Option<String>,
    term_defaults: TermDefaults,
}

impl SystemHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_term_defaults(mut self, defaults: TermDefaults) -> Self {
        self.term_defaults = defaults;
        self
    }

    fn current_user() -> Option<User> {
        match User::from_uid(Uid::current()) {
            Ok(user) => user,
            Err(e) => {
                debug!(error = %e, "passwd lookup failed");
                None
            }
        }
    }
}

fn absolute_env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
}

impl ShellHost for SystemHost {
    fn shell_path(&self) -> PathBuf {
        if let Some(shell) = &self.shell {
            return shell.clone();
        }
        if let Some(shell) = absolute_env_path("SHELL").filter(|p| p.exists()) {
            return shell;
        }
        if let Some(user) = Self::current_user().filter(|u| u.shell.exists()) {
            return user.shell;
        }
        ["/bin/bash", "/bin/sh"]
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .unwrap_or_else(|| Path::new("/bin/sh"))
            .to_path_buf()
    }

    fn term_defaults(&self) -> TermDefaults {
        self.term_defaults.clone()
    }

    fn env_vars(&self, term_type: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("TERM".to_string(), term_type.to_string()),
            ("COLORTERM".to_string(), "truecolor".to_string()),
        ])
    }

    fn lang(&self) -> String {
        self.lang
            .clone()
            .unwrap_or_else(|| DEFAULT_LANG.to_string())
    }

    fn home_dir(&self) -> PathBuf {
        if let Some(home) = &self.home {
            return home.clone();
        }
        absolute_env_path("HOME")
            .or_else(|| Self::current_user().map(|u| u.dir))
            .unwrap_or_else(|| PathBuf::from("/"))
    }
}
