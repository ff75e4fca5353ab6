//! Terminal dimensions

use crate::host::TermDefaults;
use crate::{Result, ShellExecError};
use nix::pty::Winsize;
use std::fmt;

/// Requested terminal size as supplied by the host.
///
/// A zero in either dimension means "use the default size".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TermSize {
    pub rows: i32,
    pub cols: i32,
}

impl TermSize {
    pub fn new(rows: i32, cols: i32) -> Self {
        Self { rows, cols }
    }

    /// Substitute defaults for a zero dimension, then validate.
    ///
    /// Both dimensions are replaced when either one is zero.
    pub fn resolve(self, defaults: &TermDefaults) -> Result<PtySize> {
        let size = if self.rows == 0 || self.cols == 0 {
            TermSize::new(defaults.rows, defaults.cols)
        } else {
            self
        };

        match (u16::try_from(size.rows), u16::try_from(size.cols)) {
            (Ok(rows), Ok(cols)) if rows > 0 && cols > 0 => Ok(PtySize { rows, cols }),
            _ => Err(ShellExecError::InvalidSize(size)),
        }
    }
}

impl fmt::Display for TermSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// A validated size that can be applied to a PTY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PtySize {
    pub rows: u16,
    pub cols: u16,
}

impl PtySize {
    pub(crate) fn to_winsize(self) -> Winsize {
        Winsize {
            ws_row: self.rows,
            ws_col: self.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        }
    }

    pub(crate) fn from_winsize(ws: &Winsize) -> Self {
        Self {
            rows: ws.ws_row,
            cols: ws.ws_col,
        }
    }
}

impl From<PtySize> for TermSize {
    fn from(size: PtySize) -> Self {
        TermSize::new(i32::from(size.rows), i32::from(size.cols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> TermDefaults {
        TermDefaults {
            rows: 25,
            cols: 80,
            term_type: "xterm-256color".to_string(),
        }
    }

    #[test]
    fn test_explicit_size_is_kept() {
        let size = TermSize::new(40, 120).resolve(&defaults()).unwrap();
        assert_eq!(size, PtySize { rows: 40, cols: 120 });
    }

    #[test]
    fn test_zero_dimension_uses_defaults() {
        let size = TermSize::new(0, 132).resolve(&defaults()).unwrap();
        assert_eq!(size, PtySize { rows: 25, cols: 80 });

        let size = TermSize::default().resolve(&defaults()).unwrap();
        assert_eq!(size, PtySize { rows: 25, cols: 80 });
    }

    #[test]
    fn test_negative_size_is_rejected() {
        let err = TermSize::new(-1, 80).resolve(&defaults()).unwrap_err();
        assert!(matches!(err, ShellExecError::InvalidSize(s) if s == TermSize::new(-1, 80)));
    }

    #[test]
    fn test_bad_defaults_are_rejected() {
        let bad = TermDefaults {
            rows: -5,
            cols: 80,
            term_type: "dumb".to_string(),
        };
        let err = TermSize::new(0, 0).resolve(&bad).unwrap_err();
        assert!(matches!(err, ShellExecError::InvalidSize(s) if s == TermSize::new(-5, 80)));
    }

    #[test]
    fn test_oversized_dimension_is_rejected() {
        let err = TermSize::new(24, 70_000).resolve(&defaults()).unwrap_err();
        assert!(matches!(err, ShellExecError::InvalidSize(_)));
    }

    #[test]
    fn test_winsize_conversion() {
        let size = PtySize { rows: 30, cols: 100 };
        assert_eq!(PtySize::from_winsize(&size.to_winsize()), size);
    }
}
