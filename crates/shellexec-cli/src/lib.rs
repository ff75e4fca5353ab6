//! shellexec command-line front end

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use shellexec::host::{DEFAULT_TERM_COLS, DEFAULT_TERM_ROWS, DEFAULT_TERM_TYPE};
use shellexec::{
    exit_code, CommandOptions, ExitResult, Launcher, ShellExecError, ShellHost, SystemHost,
    TermDefaults, TermSize, WaitError,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run shell commands on a pseudo-terminal")]
struct Args {
    /// Log level
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Shell to launch (defaults to $SHELL, then the passwd entry)
    #[arg(long)]
    shell: Option<PathBuf>,

    /// Value for TERM when the environment does not set one
    #[arg(long, default_value = DEFAULT_TERM_TYPE)]
    term_type: String,

    /// Rows used when --rows or --cols is 0
    #[arg(long, default_value_t = DEFAULT_TERM_ROWS, allow_negative_numbers = true)]
    default_rows: i32,

    /// Columns used when --rows or --cols is 0
    #[arg(long, default_value_t = DEFAULT_TERM_COLS, allow_negative_numbers = true)]
    default_cols: i32,

    /// Locale used when LANG is unset
    #[arg(long)]
    lang: Option<String>,

    /// Terminal rows (0 = default)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    rows: i32,

    /// Terminal columns (0 = default)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    cols: i32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a command to completion and print its terminal output
    Run {
        /// Command line passed to the shell with -c
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Start a shell and stream its terminal output until it exits
    Exec {
        /// Start a login shell
        #[arg(short, long)]
        login: bool,

        /// Start an interactive shell
        #[arg(short, long)]
        interactive: bool,

        /// Working directory (falls back to home if unusable)
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Extra environment variable, KEY=VALUE
        #[arg(long = "env", value_parser = parse_env_var)]
        env: Vec<(String, String)>,

        /// Kill the shell after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Command line passed to the shell with -c; a top-level shell if empty
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
    },
}

fn parse_env_var(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

/// Map a termination result onto a status for this process, using the
/// shell convention of 128 + signal for signaled children.
fn process_exit_code(result: &ExitResult) -> i32 {
    match result {
        Err(WaitError::Signaled { signal, .. }) => 128 + signal,
        other => match exit_code(other) {
            code if code < 0 => 1,
            code => code,
        },
    }
}

fn build_host(args: &Args) -> SystemHost {
    let mut host = SystemHost::new().with_term_defaults(TermDefaults {
        rows: args.default_rows,
        cols: args.default_cols,
        term_type: args.term_type.clone(),
    });
    if let Some(shell) = &args.shell {
        host = host.with_shell(shell);
    }
    if let Some(lang) = &args.lang {
        host = host.with_lang(lang);
    }
    host
}

pub async fn run() -> Result<i32> {
    let args = Args::parse();

    let log_level = match args.log_level {
        LogLevel::Trace => tracing::Level::TRACE,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Error => tracing::Level::ERROR,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .init();

    let host = Arc::new(build_host(&args));
    let launcher = Launcher::new(host.clone());
    let size = TermSize::new(args.rows, args.cols);

    match args.command {
        Commands::Run { command } => run_command(&launcher, host.as_ref(), size, &command).await,
        Commands::Exec {
            login,
            interactive,
            cwd,
            env,
            timeout,
            command,
        } => {
            let mut opts = CommandOptions::new().login(login).interactive(interactive);
            opts.cwd = cwd;
            opts.env.extend(env);
            exec_shell(&launcher, size, &command.join(" "), &opts, timeout).await
        }
    }
}

async fn run_command(
    launcher: &Launcher,
    host: &dyn ShellHost,
    size: TermSize,
    command: &[String],
) -> Result<i32> {
    let mut cmd = Command::new(host.shell_path());
    cmd.arg("-c").arg(command.join(" "));

    match launcher.run_capturing_output_async(cmd, size).await {
        Ok(output) => {
            io::stdout()
                .write_all(&output)
                .context("Failed to write output")?;
            Ok(0)
        }
        Err(ShellExecError::Exit(e)) => {
            eprintln!("shellexec: {e}");
            Ok(process_exit_code(&Err(e)))
        }
        Err(e) => Err(e).context("Failed to run command"),
    }
}

async fn exec_shell(
    launcher: &Launcher,
    size: TermSize,
    command: &str,
    opts: &CommandOptions,
    timeout: Option<u64>,
) -> Result<i32> {
    let proc = launcher
        .start_shell_proc(size, command, opts)
        .context("Failed to start shell")?;
    info!(pid = proc.pid(), size = ?proc.pty_size().ok(), "shell started");

    let mut pty = proc.try_clone_pty().context("Failed to open pty")?;
    let pump = tokio::task::spawn_blocking(move || {
        let mut stdout = io::stdout().lock();
        if let Err(e) = io::copy(&mut pty, &mut stdout) {
            debug!(error = %e, "pty output ended");
        }
        if let Err(e) = stdout.flush() {
            debug!(error = %e, "flushing stdout failed");
        }
    });

    let result = match timeout {
        Some(secs) => {
            match tokio::time::timeout(Duration::from_secs(secs), proc.wait_async()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(pid = proc.pid(), secs, "timed out, killing shell");
                    proc.close();
                    proc.wait_async().await
                }
            }
        }
        None => proc.wait_async().await,
    };

    // Background jobs may keep the pty open; don't wait on them forever.
    if tokio::time::timeout(Duration::from_secs(1), pump).await.is_err() {
        debug!(pid = proc.pid(), "pty still open after exit");
    }
    proc.close();

    info!(pid = proc.pid(), ?result, "shell finished");
    Ok(process_exit_code(&result))
}
