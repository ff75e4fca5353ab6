//! Launching shells on a PTY
//!
//! [`Launcher`] starts long-lived shell processes wrapped in a
//! [`ShellProc`], and runs one-shot commands to completion while
//! capturing their terminal output.

use crate::env::{self, EnvMap};
use crate::exit::{exit_result, WaitError};
use crate::host::ShellHost;
use crate::options::CommandOptions;
use crate::proc::ShellProc;
use crate::pty::{Pty, PtyMaster};
use crate::session::make_session_leader;
use crate::size::{PtySize, TermSize};
use crate::{Result, ShellExecError};
use std::fs::File;
use std::io::{self, Read};
use std::panic;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace};

/// Spawns processes on fresh PTYs using a fixed base environment
#[derive(Clone)]
pub struct Launcher {
    host: Arc<dyn ShellHost>,
    base_env: EnvMap,
}

impl Launcher {
    /// Create a launcher over a snapshot of the current process environment
    pub fn new(host: Arc<dyn ShellHost>) -> Self {
        Self::with_base_env(host, env::from_process())
    }

    /// Create a launcher whose children inherit `base_env` instead of the
    /// real process environment
    pub fn with_base_env(host: Arc<dyn ShellHost>, base_env: EnvMap) -> Self {
        Self { host, base_env }
    }

    /// The host supplying shell, defaults and baseline environment
    pub fn host(&self) -> &dyn ShellHost {
        self.host.as_ref()
    }

    /// Environment every child starts from
    pub fn base_env(&self) -> &EnvMap {
        &self.base_env
    }

    /// Start a shell on a new PTY.
    ///
    /// With an empty `cmd_str` the shell runs as a top-level shell,
    /// otherwise it runs `cmd_str` via `-c`.
    pub fn start_shell_proc(
        &self,
        size: TermSize,
        cmd_str: &str,
        opts: &CommandOptions,
    ) -> Result<ShellProc> {
        let defaults = self.host.term_defaults();
        let size = size.resolve(&defaults)?;

        let shell = self.host.shell_path();
        let mut cmd = Command::new(&shell);
        cmd.args(opts.shell_flags());
        if !cmd_str.is_empty() {
            cmd.arg("-c").arg(cmd_str);
        }

        let mut child_env = env::compose(&self.base_env, self.host(), &defaults.term_type);
        env::apply_overrides(&mut child_env, &opts.env);
        cmd.env_clear().envs(&child_env);

        let cwd = self.resolve_cwd(opts.cwd.as_deref());
        cmd.current_dir(&cwd);

        debug!(
            shell = %shell.display(),
            cwd = %cwd.display(),
            rows = size.rows,
            cols = size.cols,
            "starting shell process"
        );

        let (child, master) = spawn_in_pty(cmd, size)?;
        ShellProc::new(child, master, defaults)
    }

    /// Run `cmd` on a new PTY until it exits and return everything it wrote.
    ///
    /// A non-zero exit or other wait failure is returned as
    /// [`ShellExecError::Exit`] and the captured output is discarded.
    pub fn run_capturing_output(&self, mut cmd: Command, size: TermSize) -> Result<Vec<u8>> {
        let defaults = self.host.term_defaults();
        let size = size.resolve(&defaults)?;

        let mut child_env = env::compose(&self.base_env, self.host(), &defaults.term_type);
        env::apply_command_envs(&mut child_env, &cmd);
        cmd.env_clear().envs(&child_env);

        debug!(
            program = ?cmd.get_program(),
            rows = size.rows,
            cols = size.cols,
            "running command"
        );

        let (mut child, master) = spawn_in_pty(cmd, size)?;
        let master = master.into_file();

        let (status, output) = thread::scope(|scope| {
            let drain = thread::Builder::new()
                .name("shellexec-drain".to_string())
                .spawn_scoped(scope, || drain_pty(&master));
            let drain = match drain {
                Ok(drain) => drain,
                Err(e) => {
                    if let Err(e) = child.kill() {
                        debug!(pid = child.id(), error = %e, "kill failed");
                    }
                    if let Err(e) = child.wait() {
                        debug!(pid = child.id(), error = %e, "reap failed");
                    }
                    return Err(ShellExecError::Io(e));
                }
            };

            let status = child.wait();
            let output = drain
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload));
            Ok((status, output))
        })?;
        drop(master);

        let status = status.map_err(|e| WaitError::Wait(e.to_string()))?;
        debug!(pid = child.id(), %status, bytes = output.len(), "command finished");
        exit_result(status)?;
        Ok(output)
    }

    /// [`Launcher::run_capturing_output`] on tokio's blocking pool
    pub async fn run_capturing_output_async(
        &self,
        cmd: Command,
        size: TermSize,
    ) -> Result<Vec<u8>> {
        let launcher = self.clone();
        tokio::task::spawn_blocking(move || launcher.run_capturing_output(cmd, size))
            .await
            .map_err(|e| ShellExecError::Io(io::Error::new(io::ErrorKind::Other, e)))?
    }

    fn resolve_cwd(&self, requested: Option<&Path>) -> PathBuf {
        if let Some(path) = requested.filter(|p| !p.as_os_str().is_empty()) {
            match std::fs::metadata(path) {
                Ok(meta) if meta.is_dir() => return path.to_path_buf(),
                Ok(_) => debug!(cwd = %path.display(), "cwd is not a directory, using home"),
                Err(e) => debug!(cwd = %path.display(), error = %e, "cannot stat cwd, using home"),
            }
        }
        self.host.home_dir()
    }
}

/// Open a PTY of `size`, bind its slave to the standard streams of `cmd`
/// and start it.
///
/// The parent's slave descriptors are closed as soon as the spawn attempt
/// returns; on failure the master is closed too.
fn spawn_in_pty(mut cmd: Command, size: PtySize) -> Result<(Child, PtyMaster)> {
    let pty = Pty::open(size).map_err(ShellExecError::Pty)?;
    let [stdin, stdout, stderr] = pty.slave_stdio().map_err(ShellExecError::Pty)?;
    cmd.stdin(stdin).stdout(stdout).stderr(stderr);
    make_session_leader(&mut cmd);

    let spawned = cmd.spawn();
    drop(cmd);
    let master = pty.into_master();

    match spawned {
        Ok(child) => {
            trace!(pid = child.id(), "process started");
            Ok((child, master))
        }
        Err(e) => {
            drop(master);
            Err(ShellExecError::Start(e))
        }
    }
}

/// Copy everything readable from the PTY master until it reports end of
/// stream or an error. The device errors once the child side is gone, so
/// read errors just end the drain.
fn drain_pty(mut master: &File) -> Vec<u8> {
    let mut output = Vec::new();
    let mut buffer = [0u8; 4096];

    loop {
        match master.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => output.extend_from_slice(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                trace!(error = %e, "pty drain finished");
                break;
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SystemHost;
    use std::ffi::OsString;

    fn launcher() -> Launcher {
        let base: EnvMap = [("PATH", "/usr/bin:/bin")]
            .into_iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect();
        Launcher::with_base_env(
            Arc::new(SystemHost::new().with_shell("/bin/sh").with_home("/")),
            base,
        )
    }

    #[test]
    fn test_resolve_cwd_falls_back_to_home() {
        let launcher = launcher();
        assert_eq!(launcher.resolve_cwd(None), PathBuf::from("/"));
        assert_eq!(launcher.resolve_cwd(Some(Path::new(""))), PathBuf::from("/"));
        assert_eq!(
            launcher.resolve_cwd(Some(Path::new("/definitely/not/here"))),
            PathBuf::from("/")
        );
        assert_eq!(
            launcher.resolve_cwd(Some(Path::new("/bin/sh"))),
            PathBuf::from("/")
        );
        assert_eq!(
            launcher.resolve_cwd(Some(Path::new("/tmp"))),
            PathBuf::from("/tmp")
        );
    }

    #[test]
    fn test_run_capturing_output_echo() {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg("echo hello");
        let output = launcher()
            .run_capturing_output(cmd, TermSize::default())
            .unwrap();
        assert!(String::from_utf8_lossy(&output).contains("hello"));
    }

    #[test]
    fn test_run_capturing_output_failure_discards_output() {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg("echo partial; exit 1");
        let err = launcher()
            .run_capturing_output(cmd, TermSize::default())
            .unwrap_err();
        assert!(matches!(err, ShellExecError::Exit(WaitError::Exited(1))));
    }

    #[test]
    fn test_start_failure_is_reported() {
        let launcher = Launcher::with_base_env(
            Arc::new(SystemHost::new().with_shell("/nonexistent/shell")),
            EnvMap::new(),
        );
        let err = launcher
            .start_shell_proc(TermSize::default(), "", &CommandOptions::new())
            .unwrap_err();
        assert!(matches!(err, ShellExecError::Start(_)));
    }
}
