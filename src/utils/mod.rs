use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_FILENAME: &str = "downloaded_video";
pub const MAX_FILENAME_CHARS: usize = 150;
/// Byte budget for the stem, leaving room for `.ext` under the usual
/// 255-byte file name limit.
pub const MAX_FILENAME_BYTES: usize = 200;

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("valid regex"));
static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("valid regex"));

/// Makes a caller-supplied name safe to use as a file name on any common
/// file system. Running it on its own output is a no-op.
pub fn sanitize_filename(filename: &str) -> String {
    let without_invalid = INVALID_CHARS.replace_all(filename, "");
    let collapsed = SEPARATOR_RUNS.replace_all(&without_invalid, "_");
    let trimmed = truncate(&collapsed).trim_matches(|c| c == '_' || c == ' ');

    if trimmed.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Cuts `s` to at most [`MAX_FILENAME_CHARS`] characters and
/// [`MAX_FILENAME_BYTES`] bytes, on a character boundary.
fn truncate(s: &str) -> &str {
    let end = s
        .char_indices()
        .take(MAX_FILENAME_CHARS)
        .map(|(idx, c)| idx + c.len_utf8())
        .take_while(|&end| end <= MAX_FILENAME_BYTES)
        .last()
        .unwrap_or(0);
    &s[..end]
}

/// Drops a trailing `.ext` from `filename`. Leading dots (hidden files) and
/// dots inside directory components are not treated as extensions.
pub fn strip_extension(filename: &str) -> &str {
    let base_start = filename
        .rfind(['/', '\\'])
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let base = &filename[base_start..];

    match base.rfind('.') {
        Some(idx) if base[..idx].chars().any(|c| c != '.') => &filename[..base_start + idx],
        _ => filename,
    }
}

/// Renders a byte count the way the frontend shows it, e.g. `"12.34 MB"`.
pub fn format_size(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) if bytes > 0 => format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0)),
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_removes_invalid_chars() {
        assert_eq!(sanitize_filename(r#"a\b/c*d?e:f"g<h>i|j"#), "abcdefghij");
        assert_eq!(sanitize_filename("My Video: The Sequel?"), "My_Video_The_Sequel");
    }

    #[test]
    fn test_sanitize_filename_collapses_whitespace_and_underscores() {
        assert_eq!(sanitize_filename("a   b__c \t_ d"), "a_b_c_d");
        assert_eq!(sanitize_filename("  _leading and trailing_  "), "leading_and_trailing");
    }

    #[test]
    fn test_sanitize_filename_defaults_when_empty() {
        assert_eq!(sanitize_filename(""), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename("???"), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename(" _ _ "), DEFAULT_FILENAME);
    }

    #[test]
    fn test_sanitize_filename_limits_length() {
        let long = "x".repeat(400);
        assert_eq!(sanitize_filename(&long).chars().count(), MAX_FILENAME_CHARS);

        let two_byte = "é".repeat(200);
        let sanitized = sanitize_filename(&two_byte);
        assert_eq!(sanitized.chars().count(), MAX_FILENAME_BYTES / 2);
        assert_eq!(sanitized.len(), MAX_FILENAME_BYTES);
    }

    #[test]
    fn test_sanitize_filename_limits_bytes_on_char_boundary() {
        let cjk = "日本語のタイトル".repeat(12);
        let sanitized = sanitize_filename(&cjk);

        assert!(sanitized.len() <= MAX_FILENAME_BYTES);
        assert_eq!(sanitized.chars().count(), MAX_FILENAME_BYTES / 3);
        assert!(cjk.starts_with(&sanitized));
        assert_eq!(sanitize_filename(&sanitized), sanitized);
    }

    #[test]
    fn test_sanitize_filename_is_idempotent() {
        let inputs = [
            "",
            "plain",
            "My Video: The Sequel?",
            "  __weird__ name__ ",
            "日本語 タイトル | 公式",
            &format!("{}_tail", "a".repeat(149)),
            &"ab ".repeat(100),
            &"日本 ".repeat(60),
        ];

        for input in inputs {
            let once = sanitize_filename(input);
            let twice = sanitize_filename(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", input);
            assert!(once.chars().count() <= MAX_FILENAME_CHARS);
            assert!(once.len() <= MAX_FILENAME_BYTES);
            assert!(!once.contains(['\\', '/', '*', '?', ':', '"', '<', '>', '|']));
        }
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("video.mp4"), "video");
        assert_eq!(strip_extension("my.video.webm"), "my.video");
        assert_eq!(strip_extension("video"), "video");
        assert_eq!(strip_extension(".hidden"), ".hidden");
        assert_eq!(strip_extension("dir.d/video"), "dir.d/video");
        assert_eq!(strip_extension(""), "");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(None), "N/A");
        assert_eq!(format_size(Some(0)), "N/A");
        assert_eq!(format_size(Some(1024 * 1024)), "1.00 MB");
        assert_eq!(format_size(Some(5_500_000)), "5.25 MB");
    }
}
