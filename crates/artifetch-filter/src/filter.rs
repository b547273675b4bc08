use std::collections::HashSet;

use crate::{Error, Glob, MatchOptions, Result, expand_braces};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternKind {
    Include,
    Exclude,
}

/// One filter line after comment/negation handling and brace expansion.
#[derive(Clone, Debug)]
pub struct CompiledPattern {
    source: String,
    kind: PatternKind,
    globs: Vec<Glob>,
}

impl CompiledPattern {
    /// Parse a raw filter line.
    ///
    /// Returns `Ok(None)` for blank lines and comments.
    pub fn parse(raw: &str, options: &MatchOptions) -> Result<Option<Self>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if options.comments && trimmed.starts_with('#') {
            return Ok(None);
        }

        let (kind, body) = if options.negation {
            let negations = trimmed.chars().take_while(|c| *c == '!').count();
            let exclude = (negations % 2 == 1) != options.flip_negate;
            let kind = if exclude { PatternKind::Exclude } else { PatternKind::Include };
            (kind, trimmed[negations..].trim())
        } else {
            (PatternKind::Include, trimmed)
        };

        if body.is_empty() {
            return Err(Error::EmptyPattern {
                pattern: raw.to_string(),
            });
        }

        let body = if options.windows_paths {
            body.replace('\\', "/")
        } else {
            body.to_string()
        };

        let expanded = if options.brace_expansion {
            expand_braces(&body, options.escapes())?
        } else {
            vec![body]
        };

        let globs = expanded
            .iter()
            .map(|pattern| Glob::new(pattern, options))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Self {
            source: raw.to_string(),
            kind,
            globs,
        }))
    }

    pub fn kind(&self) -> PatternKind { self.kind }

    pub fn as_str(&self) -> &str { &self.source }

    pub fn is_match(&self, path: &str) -> bool { self.globs.iter().any(|g| g.is_match(path)) }
}

/// A pattern that was dropped from the filter, with the reason.
#[derive(Debug)]
pub struct SkippedPattern {
    pub pattern: String,
    pub error: Error,
}

/// An ordered list of compiled include/exclude patterns.
#[derive(Debug, Default)]
pub struct Filter {
    patterns: Vec<CompiledPattern>,
    skipped: Vec<SkippedPattern>,
}

impl Filter {
    /// Compile `patterns` in order. Malformed patterns are skipped and
    /// reported through [`Filter::skipped`]; they never abort the filter.
    pub fn new<I, S>(patterns: I, options: &MatchOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for raw in patterns {
            let raw = raw.as_ref();
            match CompiledPattern::parse(raw, options) {
                Ok(Some(pattern)) => filter.patterns.push(pattern),
                Ok(None) => tracing::trace!(pattern = raw, "ignoring blank or comment pattern"),
                Err(error) => {
                    tracing::warn!(pattern = raw, %error, "skipping filter pattern");
                    filter.skipped.push(SkippedPattern {
                        pattern: raw.to_string(),
                        error,
                    });
                }
            }
        }
        filter
    }

    /// Evaluate every pattern against the full `paths` universe.
    pub fn apply<I, S>(&self, paths: I) -> HashSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let universe: Vec<S> = paths.into_iter().collect();
        let mut selected = HashSet::new();

        for pattern in &self.patterns {
            let hits = universe
                .iter()
                .map(|path| path.as_ref())
                .filter(|path| pattern.is_match(path));
            match pattern.kind {
                PatternKind::Include => {
                    for path in hits {
                        selected.insert(path.to_string());
                    }
                }
                PatternKind::Exclude => {
                    for path in hits {
                        selected.remove(path);
                    }
                }
            }
        }
        selected
    }

    pub fn patterns(&self) -> &[CompiledPattern] { &self.patterns }

    pub fn skipped(&self) -> &[SkippedPattern] { &self.skipped }

    pub fn is_empty(&self) -> bool { self.patterns.is_empty() }
}

/// Select the subset of `paths` chosen by the ordered `patterns`.
pub fn filter<P, S, Q, T>(paths: P, patterns: Q, options: &MatchOptions) -> HashSet<String>
where
    P: IntoIterator<Item = S>,
    S: AsRef<str>,
    Q: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    Filter::new(patterns, options).apply(paths)
}
