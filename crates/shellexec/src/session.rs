//! Session leader and controlling terminal setup for PTY children
//!
//! Runs in the forked child before exec, after std has bound the PTY slave
//! to the standard streams.

use std::process::Command;

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd"
))]
pub(crate) fn make_session_leader(cmd: &mut Command) {
    use std::io;
    use std::os::unix::process::CommandExt;

    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid()?;
            if libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY as _, 0) < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

// No TIOCSCTTY here; the first terminal a session leader opens becomes its
// controlling terminal, so a new session is all we can ask for.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd"
)))]
pub(crate) fn make_session_leader(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid()?;
            Ok(())
        });
    }
}
