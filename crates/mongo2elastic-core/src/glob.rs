//! Glob patterns over dotted field paths.
//!
//! | Syntax  | Matches                                             |
//! |---------|-----------------------------------------------------|
//! | `*`     | any run of characters within one segment            |
//! | `**`    | any number of segments, as a whole segment only     |
//! | `?`     | one character within a segment                      |
//! | `[abc]` | one character from the class (`[!abc]` negates)     |
//! | `{a,b}` | either alternative                                  |
//! | `\x`    | the literal character `x`                           |
//!
//! Paths and patterns are mapped onto `/` separators and matched with
//! `globset`, with `literal_separator` so wildcards never cross a segment.

use std::fmt;

use globset::{GlobBuilder, GlobMatcher};

use crate::error::ConvertError;

/// A compiled path glob.
#[derive(Clone)]
pub struct GlobPattern {
    pattern: String,
    matcher: GlobMatcher,
}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobPattern").field(&self.pattern).finish()
    }
}

impl GlobPattern {
    /// Compile `pattern`, failing on unbalanced classes or braces.
    pub fn compile(pattern: &str) -> Result<Self, ConvertError> {
        let invalid = |message: String| ConvertError::InvalidPattern {
            pattern: pattern.to_string(),
            message,
        };

        if pattern.is_empty() {
            return Err(invalid("empty pattern".to_string()));
        }

        let glob = GlobBuilder::new(&to_slash_pattern(pattern))
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .map_err(|e| invalid(e.kind().to_string()))?;
        Ok(Self {
            pattern: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// Does the dotted `path` match this pattern?
    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path.replace('.', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

/// Rewrite a dotted pattern onto `/` separators.
///
/// `.` becomes `/` outside character classes. Negated classes also exclude
/// `/`, which `literal_separator` does not cover, so `[!a]` stays inside one
/// segment.
fn to_slash_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push('[');
                if chars.next_if_eq(&'!').is_some() {
                    out.push_str("!/");
                }
                // A leading `]` is a class member, not the end.
                if chars.next_if_eq(&']').is_some() {
                    out.push(']');
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '.' if !in_class => out.push('/'),
            other => out.push(other),
        }
    }
    out
}
