//! SQL Sanitizer
//!
//! Strips generation artifacts (markdown fences and a `sql` language tag)
//! from raw oracle output. The SQL text itself is never rewritten.
//!
//! Sanitizing is idempotent: the result is trimmed and never starts with a
//! fence, so a second pass has nothing to remove.

use std::fmt;

const FENCE: &str = "```";
const LANGUAGE_TAG: &str = "sql";

/// Oracle output with formatting artifacts removed; not yet trusted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedQuery(String);

impl SanitizedQuery {
    /// The query text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SanitizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for SanitizedQuery {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Remove fences and language tag from raw generation output
#[must_use]
pub fn sanitize(raw: &str) -> SanitizedQuery {
    let mut text = raw.trim();

    while text.starts_with(FENCE) {
        text = text.trim_start_matches('`');
        text = strip_language_tag(text);
        text = text.trim_end_matches('`').trim();
    }

    SanitizedQuery(text.to_string())
}

/// Drop a leading `sql` token when it stands alone (`sqlite` is left intact)
fn strip_language_tag(text: &str) -> &str {
    let Some(tag) = text.get(..LANGUAGE_TAG.len()) else {
        return text;
    };
    if !tag.eq_ignore_ascii_case(LANGUAGE_TAG) {
        return text;
    }

    let rest = &text[LANGUAGE_TAG.len()..];
    match rest.chars().next() {
        None => rest,
        Some(c) if c.is_whitespace() => rest,
        Some(_) => text,
    }
}
