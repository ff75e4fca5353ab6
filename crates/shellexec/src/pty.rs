//! Low-level PTY allocation and management
//!
//! Provides PTY handling for Unix-like systems

use crate::size::PtySize;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::pty::{openpty, OpenptyResult};
use std::fs::File;
use std::io;
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::process::Stdio;

/// A pseudo-terminal pair
pub struct Pty {
    /// Master side, kept by the parent
    master: PtyMaster,

    /// Slave side, handed to the child as its standard streams
    slave: OwnedFd,
}

/// Master side of a PTY
#[derive(Debug)]
pub struct PtyMaster {
    fd: OwnedFd,
}

impl Pty {
    /// Allocate a new PTY pair with the given window size
    ///
    /// Both descriptors are close-on-exec so only the streams explicitly
    /// bound to the slave reach the child.
    pub fn open(size: PtySize) -> io::Result<Self> {
        let winsize = size.to_winsize();
        let OpenptyResult { master, slave } = openpty(Some(&winsize), None)?;

        for fd in [&master, &slave] {
            fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
        }

        Ok(Self {
            master: PtyMaster { fd: master },
            slave,
        })
    }

    /// Get the master side of the PTY
    pub fn master(&self) -> &PtyMaster {
        &self.master
    }

    /// Three stdio handles duplicated from the slave, for stdin, stdout and stderr
    pub fn slave_stdio(&self) -> io::Result<[Stdio; 3]> {
        Ok([
            Stdio::from(self.slave.try_clone()?),
            Stdio::from(self.slave.try_clone()?),
            Stdio::from(self.slave.try_clone()?),
        ])
    }

    /// Close the slave and keep the master
    pub fn into_master(self) -> PtyMaster {
        drop(self.slave);
        self.master
    }
}

impl PtyMaster {
    /// Apply a window size
    pub fn set_size(&self, size: PtySize) -> io::Result<()> {
        let winsize = size.to_winsize();
        let ret = unsafe {
            libc::ioctl(
                self.fd.as_raw_fd(),
                libc::TIOCSWINSZ,
                &winsize as *const libc::winsize,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Query the window size currently set on the device
    pub fn size(&self) -> io::Result<PtySize> {
        let mut winsize = PtySize { rows: 0, cols: 0 }.to_winsize();
        let ret = unsafe {
            libc::ioctl(
                self.fd.as_raw_fd(),
                libc::TIOCGWINSZ,
                &mut winsize as *mut libc::winsize,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(PtySize::from_winsize(&winsize))
    }

    /// Duplicate the master descriptor as a `File`
    pub fn try_clone_file(&self) -> io::Result<File> {
        Ok(File::from(self.fd.try_clone()?))
    }

    /// Take the master descriptor as a `File`
    pub fn into_file(self) -> File {
        File::from(self.fd)
    }
}

impl AsRawFd for PtyMaster {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for PtyMaster {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}
