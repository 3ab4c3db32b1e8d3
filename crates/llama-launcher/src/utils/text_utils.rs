//! Text helpers for console output

use std::borrow::Cow;

pub struct TextUtils;

impl TextUtils {
    /// Human-readable size, binary units with two decimals ("11.00 GB").
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }

    /// Signed variant for estimates, which may be negative for negative context sizes.
    pub fn format_signed_bytes(bytes: f64) -> String {
        if bytes < 0.0 {
            format!("-{}", Self::format_bytes(bytes.abs() as u64))
        } else {
            Self::format_bytes(bytes as u64)
        }
    }

    /// Quote an argument for display in a POSIX shell. Unchanged when no quoting is needed.
    pub fn shell_quote(arg: &str) -> Cow<'_, str> {
        let safe = !arg.is_empty()
            && arg
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '+' | ',' | '@' | '~'));
        if safe {
            Cow::Borrowed(arg)
        } else {
            Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(TextUtils::format_bytes(0), "0.00 B");
        assert_eq!(TextUtils::format_bytes(1023), "1023.00 B");
        assert_eq!(TextUtils::format_bytes(1536), "1.50 KB");
        assert_eq!(TextUtils::format_bytes(11 * 1024 * 1024 * 1024), "11.00 GB");
    }

    #[test]
    fn test_format_signed_bytes() {
        assert_eq!(TextUtils::format_signed_bytes(-2048.0), "-2.00 KB");
        assert_eq!(TextUtils::format_signed_bytes(2048.0), "2.00 KB");
    }

    #[test]
    fn test_shell_quote_plain_arguments_untouched() {
        assert_eq!(TextUtils::shell_quote("--port"), "--port");
        assert_eq!(TextUtils::shell_quote("/models/qwen-7b.Q4_K_M.gguf"), "/models/qwen-7b.Q4_K_M.gguf");
    }

    #[test]
    fn test_shell_quote_spaces_and_quotes() {
        assert_eq!(TextUtils::shell_quote("My Models/a.gguf"), "'My Models/a.gguf'");
        assert_eq!(TextUtils::shell_quote("it's"), r"'it'\''s'");
        assert_eq!(TextUtils::shell_quote(""), "''");
    }
}
