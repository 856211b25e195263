//! Path matching logic.
//!
//! # Responsibilities
//! - Match a request path against a literal prefix (segment aware)
//! - Match a request path against a `:name` segment template
//! - Match a request path against a raw regular expression
//! - Extract sub-match data (captures) for pattern matchers
//!
//! # Design Decisions
//! - Matching is case-sensitive and sees the path component only
//! - A literal prefix only matches on a segment boundary, so `/fridge`
//!   does not accept `/fridge-extra`
//! - Raw patterns use search semantics; anchors in the pattern decide
//!   whether a partial match is accepted

use regex::Regex;

use crate::routing::RegistrationError;

/// How a route's path is specified at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    /// Literal prefix, e.g. `/items`.
    Prefix(String),
    /// Segment template with `:name` placeholders, e.g. `/items/:id`.
    Template(String),
    /// Raw regular expression, e.g. `^/items/([0-9]+)$`.
    Pattern(String),
}

impl PathSpec {
    pub fn prefix(path: impl Into<String>) -> Self {
        Self::Prefix(path.into())
    }

    pub fn template(path: impl Into<String>) -> Self {
        Self::Template(path.into())
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern(pattern.into())
    }

    /// The source text as registered.
    pub fn source(&self) -> &str {
        match self {
            PathSpec::Prefix(s) | PathSpec::Template(s) | PathSpec::Pattern(s) => s,
        }
    }

    /// Specificity of the path structure: the number of `/` in the source.
    /// For raw patterns only path separators count; a `/` inside a
    /// character class such as `[^/]` does not.
    pub fn specificity(&self) -> u32 {
        match self {
            PathSpec::Prefix(s) | PathSpec::Template(s) => {
                s.bytes().filter(|b| *b == b'/').count() as u32
            }
            PathSpec::Pattern(s) => pattern_separators(s),
        }
    }
}

fn pattern_separators(pattern: &str) -> u32 {
    let mut count = 0;
    let mut in_class = false;
    let mut escaped = false;
    for c in pattern.chars() {
        if escaped {
            escaped = false;
            if c == '/' && !in_class {
                count += 1;
            }
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => count += 1,
            _ => {}
        }
    }
    count
}

/// A compiled path matcher.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    Prefix(String),
    Pattern(Regex),
}

impl PathMatcher {
    /// Compile a path spec into a matcher.
    pub fn compile(spec: &PathSpec) -> Result<Self, RegistrationError> {
        match spec {
            PathSpec::Prefix(prefix) => {
                ensure_absolute(prefix)?;
                Ok(PathMatcher::Prefix(prefix.clone()))
            }
            PathSpec::Template(template) => {
                ensure_absolute(template)?;
                let source = template_to_regex(template)?;
                compile_regex(template, &source)
            }
            PathSpec::Pattern(pattern) => compile_regex(pattern, pattern),
        }
    }

    /// Whether this matcher can produce sub-match data.
    pub fn yields_captures(&self) -> bool {
        matches!(self, PathMatcher::Pattern(_))
    }

    /// Test the path. Returns the match context on success.
    pub fn matches(&self, path: &str) -> Option<MatchContext> {
        match self {
            PathMatcher::Prefix(prefix) => {
                if prefix_accepts(prefix, path) {
                    Some(MatchContext::default())
                } else {
                    None
                }
            }
            PathMatcher::Pattern(regex) => {
                regex.captures(path).map(|caps| MatchContext::from_captures(regex, &caps))
            }
        }
    }
}

fn ensure_absolute(path: &str) -> Result<(), RegistrationError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(RegistrationError::InvalidPath(path.to_string()))
    }
}

fn compile_regex(spec: &str, source: &str) -> Result<PathMatcher, RegistrationError> {
    Regex::new(source)
        .map(PathMatcher::Pattern)
        .map_err(|e| RegistrationError::InvalidPattern {
            spec: spec.to_string(),
            reason: e.to_string(),
        })
}

fn prefix_accepts(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || prefix.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// Translate `/items/:id` into `^/items/(?P<id>[^/]+)$`.
fn template_to_regex(template: &str) -> Result<String, RegistrationError> {
    let mut out = String::from("^");
    for (i, segment) in template.split('/').enumerate() {
        if i > 0 {
            out.push('/');
        }
        match segment.strip_prefix(':') {
            Some(name) => {
                let valid = !name.is_empty()
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    && !name.starts_with(|c: char| c.is_ascii_digit());
                if !valid {
                    return Err(RegistrationError::InvalidPattern {
                        spec: template.to_string(),
                        reason: format!("invalid segment name {:?}", name),
                    });
                }
                out.push_str(&format!("(?P<{}>[^/]+)", name));
            }
            None => out.push_str(&regex::escape(segment)),
        }
    }
    out.push('$');
    Ok(out)
}

/// Sub-match data produced by a pattern matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchContext {
    positional: Vec<Option<String>>,
    named: Vec<(String, String)>,
}

impl MatchContext {
    fn from_captures(regex: &Regex, caps: &regex::Captures<'_>) -> Self {
        // Group 0 is the whole match; callers index from 1 like regex groups.
        let positional = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();
        Self { positional, named }
    }

    /// Capture group by index. Index 0 is the whole match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.positional.get(index).and_then(|m| m.as_deref())
    }

    /// Named capture group.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of groups including the whole match.
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }
}
