use crate::quotes::unquoted_positions;

/// Split an expression (the content between `{ }`) into its base and the
/// raw modifier segments of a `|` chain, respecting quoted strings.
///
/// `||` is the logical-or operator and never separates modifiers. When the
/// first unquoted pipe is part of `||` the whole expression has no chain.
pub(crate) fn split_modifier_chain(content: &str) -> Option<(&str, Vec<&str>)> {
    let bytes = content.as_bytes();
    let positions = unquoted_positions(content, '|');
    let first = *positions.first()?;
    if bytes.get(first + 1) == Some(&b'|') {
        return None;
    }

    let separators: Vec<usize> = positions
        .into_iter()
        .filter(|&idx| bytes.get(idx + 1) != Some(&b'|') && (idx == 0 || bytes[idx - 1] != b'|'))
        .collect();

    let base = &content[..first];
    let mut segments = Vec::with_capacity(separators.len());
    for (n, &idx) in separators.iter().enumerate() {
        let end = separators.get(n + 1).copied().unwrap_or(content.len());
        segments.push(&content[idx + 1..end]);
    }

    Some((base, segments))
}

/// Parse a single raw modifier such as `truncate:5` or `Str::upper` into its
/// name and optional argument list. The split happens at the first `:` that
/// is not half of a `::` namespace separator.
pub(crate) fn parse_modifier(raw: &str) -> (&str, Option<&str>) {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    let mut idx = 0;

    while idx < bytes.len() {
        if bytes[idx] == b':' {
            if bytes.get(idx + 1) == Some(&b':') {
                idx += 2;
                continue;
            }
            return (trimmed[..idx].trim_end(), Some(&trimmed[idx + 1..]));
        }
        idx += 1;
    }

    (trimmed, None)
}
