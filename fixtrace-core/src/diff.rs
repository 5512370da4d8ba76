use std::path::Path;

use similar::TextDiff;

/// Lines of unchanged context around each hunk.
const CONTEXT_LINES: usize = 3;

/// Renders a unified diff of `before` → `after` with `a/` and `b/` headers
/// naming `file`. Identical inputs produce an empty string.
pub fn unified_diff(file: &Path, before: &str, after: &str) -> String {
    let name = file.display().to_string();
    let old_header = format!("a/{}", name.trim_start_matches('/'));
    let new_header = format!("b/{}", name.trim_start_matches('/'));
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&old_header, &new_header)
        .to_string()
}
