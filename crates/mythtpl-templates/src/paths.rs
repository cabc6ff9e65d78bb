const SCHEME_SEPARATOR: &str = "://";

/// Normalize a template path without touching the filesystem.
///
/// Repeated slashes collapse to one, `.` segments between slashes are dropped,
/// and each `segment/../` pair is removed (leftmost first) until none remain.
/// A leading `scheme://` is preserved as-is.
#[must_use]
pub fn reduce_path(path: &str) -> String {
    let (scheme, rest) = match path.find(SCHEME_SEPARATOR) {
        Some(idx) => path.split_at(idx + SCHEME_SEPARATOR.len()),
        None => ("", path),
    };

    let mut parts = collapse_empty(rest.split('/').collect());

    let last = parts.len().saturating_sub(1);
    parts = parts
        .into_iter()
        .enumerate()
        .filter(|(idx, part)| !(*part == "." && *idx > 0 && *idx < last))
        .map(|(_, part)| part)
        .collect();

    while let Some(idx) = parent_step(&parts) {
        parts.drain(idx..idx + 2);
    }

    format!("{scheme}{}", parts.join("/"))
}

/// Drop empty segments that sit between two slashes.
fn collapse_empty(parts: Vec<&str>) -> Vec<&str> {
    let last = parts.len().saturating_sub(1);
    parts
        .into_iter()
        .enumerate()
        .filter(|(idx, part)| !part.is_empty() || *idx == 0 || *idx == last)
        .map(|(_, part)| part)
        .collect()
}

/// Index of the leftmost `segment` that is followed by `..` and then a slash.
fn parent_step(parts: &[&str]) -> Option<usize> {
    parts.windows(3).position(|window| {
        !window[0].is_empty() && window[0] != ".." && window[0] != "." && window[1] == ".."
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_parent_segments() {
        assert_eq!(reduce_path("a/b/../c"), "a/c");
        assert_eq!(reduce_path("a/b/../../c"), "c");
        assert_eq!(reduce_path("templates/sub/../footer"), "templates/footer");
    }

    #[test]
    fn collapses_slashes_and_dots() {
        assert_eq!(reduce_path("a//b/./c"), "a/b/c");
        assert_eq!(reduce_path("a/././b"), "a/b");
        assert_eq!(reduce_path("a///b"), "a/b");
    }

    #[test]
    fn preserves_scheme() {
        assert_eq!(reduce_path("proto://a/../b"), "proto://b");
        assert_eq!(reduce_path("http://host//x/./y"), "http://host/x/y");
    }

    #[test]
    fn keeps_unresolvable_parents() {
        assert_eq!(reduce_path("../a"), "../a");
        assert_eq!(reduce_path("/../a"), "/../a");
        assert_eq!(reduce_path("a/.."), "a/..");
    }

    #[test]
    fn keeps_leading_and_trailing_slashes() {
        assert_eq!(reduce_path("/a/b/"), "/a/b/");
        assert_eq!(reduce_path("a/b/../"), "a/");
    }

    #[test]
    fn is_idempotent() {
        for path in ["a//b/../c/./d", "x/../../y", "s://a/b/../c"] {
            let once = reduce_path(path);
            assert_eq!(reduce_path(&once), once);
        }
    }
}
