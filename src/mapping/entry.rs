//! A single rewrite rule.

use super::MappingError;
use regex::Regex;
use smallvec::SmallVec;
use std::cmp::Ordering;

/// Pattern plus ordered replacements.
///
/// Replacements are written with `$N` group references (`/content/$1`); they
/// are stored both as written and in an unambiguous `${N}` form for
/// expansion.
#[derive(Debug, Clone)]
pub struct RewriteEntry {
    source: String,
    pattern: Regex,
    replacements: SmallVec<[String; 1]>,
    templates: SmallVec<[String; 1]>,
    status: Option<u16>,
}

impl RewriteEntry {
    /// Build an entry. The pattern is anchored at the start; with
    /// `trailing_slash` every replacement gets a trailing `/`.
    pub fn new<I, S>(
        pattern: &str,
        status: Option<u16>,
        trailing_slash: bool,
        replacements: I,
    ) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = if pattern.starts_with('^') {
            pattern.to_string()
        } else {
            format!("^{pattern}")
        };
        let compiled = Regex::new(&source).map_err(|source_err| MappingError::Pattern {
            pattern: source.clone(),
            source: source_err,
        })?;

        let mut entry = Self {
            source,
            pattern: compiled,
            replacements: SmallVec::new(),
            templates: SmallVec::new(),
            status,
        };
        for replacement in replacements {
            let mut replacement = replacement.into();
            if trailing_slash && !replacement.ends_with('/') {
                replacement.push('/');
            }
            entry.push_replacement(replacement);
        }
        Ok(entry)
    }

    /// Internal rewrite.
    pub fn internal<I, S>(pattern: &str, replacements: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(pattern, None, false, replacements)
    }

    /// External redirect answered with `status`.
    pub fn external<I, S>(pattern: &str, status: u16, replacements: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(pattern, Some(status), false, replacements)
    }

    pub(super) fn push_replacement(&mut self, replacement: String) {
        self.templates.push(to_template(&replacement));
        self.replacements.push(replacement);
    }

    /// Pattern text, including the leading `^`.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn replacements(&self) -> &[String] {
        &self.replacements
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_internal(&self) -> bool {
        self.status.is_none()
    }

    /// Rewrite `value` with every replacement, or `None` when the pattern
    /// does not match. Only the first match is replaced.
    pub fn apply(&self, value: &str) -> Option<Vec<String>> {
        if !self.pattern.is_match(value) {
            return None;
        }
        Some(
            self.templates
                .iter()
                .map(|template| self.pattern.replace(value, template.as_str()).into_owned())
                .collect(),
        )
    }

    /// Table order: longer patterns first, equal lengths by pattern text.
    pub fn specificity(&self, other: &Self) -> Ordering {
        other
            .source
            .len()
            .cmp(&self.source.len())
            .then_with(|| self.source.cmp(&other.source))
    }
}

/// Convert a `$N` replacement into the `${N}` form understood by `regex`.
///
/// `\x` yields a literal `x`; a `$` not followed by a digit is literal.
fn to_template(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len() + 4);
    let mut chars = replacement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('$') => out.push_str("$$"),
                Some(next) => out.push(next),
                None => out.push('\\'),
            },
            '$' if chars.peek().is_some_and(char::is_ascii_digit) => {
                out.push_str("${");
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    out.push(d);
                    chars.next();
                }
                out.push('}');
            }
            '$' => out.push_str("$$"),
            other => out.push(other),
        }
    }
    out
}
