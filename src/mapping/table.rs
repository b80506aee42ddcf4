//! Immutable, ordered rewrite tables.

use super::RewriteEntry;

/// One generation of rewrite rules.
///
/// Both views are sorted by [`RewriteEntry::specificity`]; the first entry
/// whose pattern matches wins.
#[derive(Debug, Clone, Default)]
pub struct RewriteTable {
    resolve: Vec<RewriteEntry>,
    map: Vec<RewriteEntry>,
    generation: u64,
}

impl RewriteTable {
    pub fn new(mut resolve: Vec<RewriteEntry>, mut map: Vec<RewriteEntry>) -> Self {
        resolve.sort_by(RewriteEntry::specificity);
        map.sort_by(RewriteEntry::specificity);
        Self {
            resolve,
            map,
            generation: 0,
        }
    }

    /// Entries applied to request keys.
    pub fn resolve_entries(&self) -> &[RewriteEntry] {
        &self.resolve
    }

    /// Entries applied to content paths when building URLs.
    pub fn map_entries(&self) -> &[RewriteEntry] {
        &self.map
    }

    /// First resolve entry matching `key` with its rewritten values.
    pub fn resolve_match(&self, key: &str) -> Option<(&RewriteEntry, Vec<String>)> {
        first_match(&self.resolve, key)
    }

    /// First map entry matching `path` with its candidate URLs.
    pub fn map_match(&self, path: &str) -> Option<(&RewriteEntry, Vec<String>)> {
        first_match(&self.map, path)
    }

    /// Number assigned when the table was published; `0` before that.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }
}

fn first_match<'a>(
    entries: &'a [RewriteEntry],
    value: &str,
) -> Option<(&'a RewriteEntry, Vec<String>)> {
    entries
        .iter()
        .find_map(|entry| entry.apply(value).map(|out| (entry, out)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_specific_entry_wins() {
        let table = RewriteTable::new(
            vec![
                RewriteEntry::internal("^[^/]+/[^/]+/", ["/"]).unwrap(),
                RewriteEntry::internal("^http/virtual.host.com.80/", ["/content/virtual/"])
                    .unwrap(),
            ],
            vec![],
        );

        let (entry, paths) = table
            .resolve_match("http/virtual.host.com.80/page.html")
            .unwrap();
        assert_eq!(entry.source(), "^http/virtual.host.com.80/");
        assert_eq!(paths, vec!["/content/virtual/page.html"]);

        let (_, paths) = table.resolve_match("http/localhost.80/page.html").unwrap();
        assert_eq!(paths, vec!["/page.html"]);
    }

    #[test]
    fn test_equal_length_sorted_by_pattern() {
        let table = RewriteTable::new(
            vec![],
            vec![
                RewriteEntry::internal("^/b", ["/y"]).unwrap(),
                RewriteEntry::internal("^/a", ["/x"]).unwrap(),
            ],
        );
        let sources: Vec<_> = table.map_entries().iter().map(|e| e.source()).collect();
        assert_eq!(sources, vec!["^/a", "^/b"]);
    }

    #[test]
    fn test_no_match_and_generation() {
        let table = RewriteTable::default();
        assert!(table.resolve_match("http/localhost.80/").is_none());
        assert_eq!(table.generation(), 0);
        assert_eq!(table.with_generation(7).generation(), 7);
    }
}
