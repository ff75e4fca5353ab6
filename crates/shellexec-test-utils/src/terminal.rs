//! Helpers for comparing PTY output

/// Strip ANSI escapes and carriage returns from raw terminal output
pub fn normalize_output(raw: &[u8]) -> String {
    let stripped = strip_ansi_escapes::strip(raw);
    String::from_utf8_lossy(&stripped).replace('\r', "")
}

/// Non-empty, right-trimmed lines of normalized output
pub fn output_lines(raw: &[u8]) -> Vec<String> {
    normalize_output(raw)
        .lines()
        .map(|line| line.trim_end().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_escapes() {
        let raw = b"\x1b[31mred\x1b[0m\r\nplain\r\n";
        assert_eq!(normalize_output(raw), "red\nplain\n");
    }

    #[test]
    fn test_output_lines_skip_blank() {
        let raw = b"one  \r\n\r\ntwo\r\n";
        assert_eq!(output_lines(raw), vec!["one", "two"]);
    }
}
