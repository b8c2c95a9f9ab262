//! Formatting utilities
//!
//! The boxed renderer greedily wraps text into a fixed-width ASCII frame:
//!
//! ```text
//! +---------------+
//! | ls lists the  |
//! | contents of a |
//! | directory.    |
//! +---------------+
//! ```

/// Line width used for all tgpt output
pub const BOX_WIDTH: usize = 80;

/// Render `text` inside a box `width` columns wide, one entry per line.
///
/// The first and last entries are the borders. Words longer than the box are
/// placed on a line of their own and overflow the right edge.
pub fn box_lines(text: &str, width: usize) -> Vec<String> {
    let border = border(width);
    let normalized: String = text
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect();

    let mut lines = vec![border.clone()];
    let mut current = String::new();
    let mut current_len = 0;

    for word in normalized.split(' ') {
        let word_len = word.chars().count();

        if current_len + word_len + 1 > width {
            lines.extend(content_line(&current, width));
            current.clear();
            current_len = 0;
        }

        current.push_str(word);
        current.push(' ');
        current_len += word_len + 1;
    }

    lines.extend(content_line(&current, width));
    lines.push(border);
    lines
}

/// Render `text` inside a box, joined into a single string
pub fn boxed(text: &str, width: usize) -> String {
    box_lines(text, width).join("\n")
}

fn border(width: usize) -> String {
    format!("+{}+", "-".repeat(width + 1))
}

/// Pad a wrapped line out to the box width. Blank lines are dropped.
fn content_line(line: &str, width: usize) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(format!(
        "| {:<pad$} |",
        trimmed,
        pad = width.saturating_sub(1)
    ))
}
