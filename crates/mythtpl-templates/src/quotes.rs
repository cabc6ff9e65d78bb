/// Find positions of a delimiter character in `s`, skipping occurrences inside
/// single- or double-quoted regions.
///
/// A `\` inside a quoted region escapes the next character, so `"a\"|b"` is a
/// single quoted region.
///
/// The callback receives the byte index of each unquoted delimiter found.
/// Return `true` from the callback to stop early.
pub(crate) fn for_each_unquoted(
    s: &str,
    delimiter: impl Fn(char) -> bool,
    mut cb: impl FnMut(usize) -> bool,
) {
    let mut quote: Option<char> = None;
    let mut escape = false;

    for (idx, ch) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if quote.is_some() => {
                escape = true;
            }
            '"' | '\'' if quote == Some(ch) => {
                quote = None;
            }
            '"' | '\'' if quote.is_none() => {
                quote = Some(ch);
            }
            _ if quote.is_some() => {}
            _ if delimiter(ch) => {
                if cb(idx) {
                    return;
                }
            }
            _ => {}
        }
    }
}

/// Collect the byte index of every unquoted occurrence of `delimiter`.
pub(crate) fn unquoted_positions(s: &str, delimiter: char) -> Vec<usize> {
    let mut positions = Vec::new();
    for_each_unquoted(
        s,
        |ch| ch == delimiter,
        |idx| {
            positions.push(idx);
            false
        },
    );
    positions
}
