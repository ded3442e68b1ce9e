//! Glob-style matching for cache key patterns.
//!
//! Invalidation patterns use the same grammar the networked tier accepts:
//! `*` matches any run of characters, `?` matches exactly one character,
//! everything else is literal. Patterns are compiled once and matched
//! against many keys.

use regex::Regex;

/// A compiled glob pattern over cache keys.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    raw: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compile a glob pattern into an anchored matcher.
    ///
    /// # Errors
    ///
    /// Returns the underlying regex error if the translated pattern fails to
    /// compile.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let mut translated = String::with_capacity(pattern.len() + 8);
        let mut literal = String::new();

        translated.push('^');
        for ch in pattern.chars() {
            match ch {
                '*' | '?' => {
                    if !literal.is_empty() {
                        translated.push_str(&regex::escape(&literal));
                        literal.clear();
                    }
                    if ch == '*' {
                        translated.push_str(".*");
                    } else {
                        translated.push('.');
                    }
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            translated.push_str(&regex::escape(&literal));
        }
        translated.push('$');

        Ok(Self { raw: pattern.to_owned(), regex: Regex::new(&translated)? })
    }

    /// Whether `key` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The original glob text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
