//! Selector and extension stripping.

/// Progressively shorter prefixes of a path, cut at the last `.` each step.
///
/// Cloning restarts from the current position, so a fresh
/// [`path_candidates`] call or a clone taken up front can be replayed.
#[derive(Debug, Clone)]
pub struct PathCandidates<'a> {
    remaining: Option<&'a str>,
}

/// Candidates for `path`, longest first.
///
/// Trailing slashes are dropped first; a bare `/` yields itself.
///
/// ```
/// use waymark::resolver::path_candidates;
///
/// let all: Vec<_> = path_candidates("/content/page.a4.print.html").collect();
/// assert_eq!(
///     all,
///     ["/content/page.a4.print.html", "/content/page.a4.print", "/content/page.a4", "/content/page"]
/// );
/// ```
pub fn path_candidates(path: &str) -> PathCandidates<'_> {
    let trimmed = path.trim_end_matches('/');
    let remaining = match trimmed {
        "" if path.starts_with('/') => Some("/"),
        "" => None,
        other => Some(other),
    };
    PathCandidates { remaining }
}

impl<'a> Iterator for PathCandidates<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.remaining?;
        self.remaining = match current.rfind('.') {
            Some(idx) if idx > 0 => Some(&current[..idx]),
            _ => None,
        };
        Some(current)
    }
}
