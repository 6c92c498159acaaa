//! Formatting helpers for human-readable replies

use chrono::{DateTime, Utc};

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with binary magnitudes (e.g. "1.50 GB")
///
/// Picks the largest unit in which the value is at least 1, up to TB.
pub fn human_readable_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, SIZE_UNITS[unit])
}

/// Render Unix seconds as `YYYY-MM-DD HH:MM:SS` (UTC, no suffix)
pub fn format_timestamp(seconds: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Escape text for Telegram's legacy Markdown parse mode
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Split a message into chunks of at most `limit` characters
///
/// Splits only between lines and keeps line order. A single line longer
/// than `limit` becomes its own (oversized) chunk rather than being cut.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    // A chunk holding only blank lines is still a started chunk
    let mut started = false;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if started && current_len + 1 + line_len > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
            started = false;
        }
        if started {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
        started = true;
    }

    if started {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable_size(0), "0 B");
        assert_eq!(human_readable_size(512), "512.00 B");
        assert_eq!(human_readable_size(1024), "1.00 KB");
        assert_eq!(human_readable_size(1536), "1.50 KB");
        assert_eq!(human_readable_size(1048576), "1.00 MB");
        assert_eq!(human_readable_size(1_610_612_736), "1.50 GB");
        assert_eq!(human_readable_size(1024u64.pow(4)), "1.00 TB");
        // Stays in TB past the last unit
        assert_eq!(human_readable_size(2048 * 1024u64.pow(4)), "2048.00 TB");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0).as_deref(), Some("1970-01-01 00:00:00"));
        assert_eq!(
            format_timestamp(1740830400).as_deref(),
            Some("2025-03-01 12:00:00")
        );
        assert_eq!(format_timestamp(i64::MAX), None);
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("Poco F5"), "Poco F5");
        assert_eq!(escape_markdown("john_doe*"), "john\\_doe\\*");
    }

    #[test]
    fn test_split_message_short() {
        assert_eq!(split_message("hello\nworld", 100), vec!["hello\nworld"]);
    }

    #[test]
    fn test_split_message_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc\ndddd";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc\ndddd"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_split_message_keeps_blank_line_at_boundary() {
        let text = "aaaa\nbbbb\n\ncccc";
        let chunks = split_message(text, 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "\ncccc"]);
        assert_eq!(chunks.join("\n"), text);

        let text = "*Poco*\n• F5\n\n*Xiaomi*\n• Pad 6\n\nfooter";
        let chunks = split_message(text, 12);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_split_message_long_line_kept_whole() {
        let text = "short\nthis line is far too long\nend";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["short", "this line is far too long", "end"]);
    }
}
