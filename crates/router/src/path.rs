//! Path canonicalization shared by route registration and route lookup.
//!
//! Every path that enters the router, whether it is a pattern passed to
//! [`RouterBuilder::route`](crate::router::RouterBuilder::route) or the path of an
//! inbound request, is reduced to the same canonical form:
//!
//! - surrounding whitespace is trimmed
//! - runs of `/` collapse into a single `/`
//! - a leading `/` is always present
//! - a trailing `/` is removed, except for the root path `/`
//!
//! ```
//! use micro_router::path::normalize;
//!
//! assert_eq!(normalize("home//about///"), "/home/about");
//! assert_eq!(normalize("////"), "/");
//! ```

/// The canonical root path.
pub const ROOT: &str = "/";

const SEPARATOR: char = '/';

/// Returns the canonical representation of `path`.
///
/// The function is idempotent: `normalize(&normalize(p)) == normalize(p)`.
pub fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in segments(path) {
        normalized.push(SEPARATOR);
        normalized.push_str(segment);
    }

    if normalized.is_empty() {
        normalized.push_str(ROOT);
    }
    normalized
}

/// Iterates the non-empty segments of the canonical form of `path` without allocating.
///
/// `segments(p)` yields exactly the `/`-separated components of [`normalize(p)`](normalize),
/// which lets the lookup path walk the tree without materializing the canonical string.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    // whitespace and separators are both stripped from the tail, so a segment can never end in
    // whitespace that a second normalization pass would remove
    path.trim_start()
        .trim_end_matches(|c: char| c == SEPARATOR || c.is_whitespace())
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
}

/// Joins a group prefix and a relative path, returning the canonical form of the concatenation.
pub fn join(prefix: &str, relative: &str) -> String {
    let mut joined = String::with_capacity(prefix.len() + relative.len() + 1);
    joined.push_str(prefix);
    joined.push(SEPARATOR);
    joined.push_str(relative);
    normalize(&joined)
}
