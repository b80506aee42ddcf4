//! Query languages understood by `MemoryStore`.
//!
//! | Language   | Statement                       | Matches                           |
//! |------------|---------------------------------|-----------------------------------|
//! | `path`     | `/content/*/page`, `/apps/**`   | node paths (glob, `*` = segment)  |
//! | `property` | `waymark:vanityPath = '/home'`  | nodes carrying a property value   |
//! | `property` | `waymark:alias`                 | nodes carrying the property       |

use super::StoreError;
use super::memory::NodeView;
use regex::Regex;
use std::sync::LazyLock;

static PROPERTY_QUERY: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r#"^\s*([^\s='"]+)\s*(?:=\s*(?:'([^']*)'|"([^"]*)"))?\s*$"#)
});

/// A compiled query statement.
pub(super) enum Matcher {
    Path(Regex),
    Property { name: String, value: Option<String> },
}

impl Matcher {
    pub(super) fn matches(&self, path: &str, node: &NodeView<'_>) -> bool {
        match self {
            Self::Path(regex) => regex.is_match(path),
            Self::Property { name, value } => match (node.properties.get(name), value) {
                (Some(_), None) => true,
                (Some(found), Some(expected)) => found.as_strings().iter().any(|v| v == expected),
                (None, _) => false,
            },
        }
    }
}

/// Compile `statement` in `language`.
pub(super) fn compile(statement: &str, language: &str) -> Result<Matcher, StoreError> {
    let syntax = |message: &str| StoreError::QuerySyntax {
        query: statement.to_string(),
        language: language.to_string(),
        message: message.to_string(),
    };

    match language {
        "path" => {
            if !statement.starts_with('/') {
                return Err(syntax("path patterns must be absolute"));
            }
            let pattern = glob_to_regex(statement).map_err(|msg| syntax(&msg))?;
            Regex::new(&pattern)
                .map(Matcher::Path)
                .map_err(|err| syntax(&err.to_string()))
        }
        "property" => {
            let grammar = PROPERTY_QUERY
                .as_ref()
                .map_err(|err| syntax(&format!("property query grammar unavailable: {err}")))?;
            let caps = grammar
                .captures(statement)
                .ok_or_else(|| syntax("expected `name` or `name = 'value'`"))?;
            let name = caps[1].to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string());
            Ok(Matcher::Property { name, value })
        }
        other => Err(StoreError::UnsupportedLanguage(other.to_string())),
    }
}

/// Translate a path glob into an anchored regex.
///
/// `**` spans segments, `*` and `?` stay inside one, `[..]` and `{a,b}` are
/// passed through as class and alternation.
fn glob_to_regex(glob: &str) -> Result<String, String> {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    let mut in_group = false;

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    class.push(c);
                }
                if !closed || class.is_empty() {
                    return Err("unterminated character class".into());
                }
                out.push('[');
                out.push_str(&class.replace('\\', "\\\\"));
                out.push(']');
            }
            '{' if !in_group => {
                in_group = true;
                out.push_str("(?:");
            }
            '{' => return Err("nested alternation".into()),
            ',' if in_group => out.push('|'),
            '}' if in_group => {
                in_group = false;
                out.push(')');
            }
            '}' => return Err("unbalanced `}`".into()),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    if in_group {
        return Err("unterminated alternation".into());
    }
    out.push('$');
    Ok(out)
}
