//! Width-aware text helpers for the sidebar and lists.

use unicode_width::UnicodeWidthChar;

/// Shortens a path to at most `max_width` display columns, keeping the
/// tail (the interesting end of a path) behind a leading ellipsis.
pub fn shorten_path(path: &str, max_width: usize) -> String {
    let width: usize = path.chars().map(|c| c.width().unwrap_or(0)).sum();
    if width <= max_width {
        return path.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut tail = Vec::new();
    let mut used = 1; // leading ellipsis
    for ch in path.chars().rev() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width {
            break;
        }
        used += w;
        tail.push(ch);
    }

    let mut out = String::from("…");
    out.extend(tail.iter().rev());
    out
}

/// Human-readable byte count for the upload list.
pub fn human_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
