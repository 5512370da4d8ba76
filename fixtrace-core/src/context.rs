//! Numbered source excerpts around a captured line.

/// Lines shown on each side of the center line.
pub const CONTEXT_RADIUS: usize = 10;

/// Renders up to 21 lines centred on the 1-indexed `line` as
/// `"<number> | <text>"`, joined with `\n`.
///
/// The window is clipped at file boundaries, never padded. An empty file
/// yields the single line `"1 | "`. Returns `None` when `line` is not in the
/// file, so a context is never produced without its center line.
pub fn extract_code_context(text: &str, line: u32) -> Option<String> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let center = line as usize;
    if center == 0 || center > lines.len() {
        return None;
    }
    let start = center.saturating_sub(CONTEXT_RADIUS + 1);
    let end = (center + CONTEXT_RADIUS).min(lines.len());
    let rendered = lines[start..end]
        .iter()
        .enumerate()
        .map(|(offset, text)| format!("{} | {}", start + offset + 1, text))
        .collect::<Vec<_>>()
        .join("\n");
    Some(rendered)
}
