use serde::Deserialize;

/// Flags controlling how filter patterns are parsed and matched.
///
/// The defaults match artifact download semantics: case-insensitive, dot
/// files matched by wildcards, brace alternation on, `#` comments and `!`
/// negation honored.
///
/// # Examples
///
/// ```
/// use artifetch_filter::MatchOptions;
///
/// let options = MatchOptions::default().case_sensitive(true).dot(false);
/// assert!(options.case_sensitive);
/// assert!(!options.dot);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Match letter case exactly.
    ///
    /// Default: false
    pub case_sensitive: bool,

    /// Let `*`, `?`, `[...]` and `**` match path segments starting with `.`.
    ///
    /// Default: true
    pub dot: bool,

    /// Expand `{a,b}` alternations before compiling.
    ///
    /// Default: true
    pub brace_expansion: bool,

    /// Treat patterns starting with `#` as comments.
    ///
    /// Default: true
    pub comments: bool,

    /// Interpret leading `!` characters as negation.
    ///
    /// When false, `!` is an ordinary character and every pattern includes.
    ///
    /// Default: true
    pub negation: bool,

    /// Invert the include/exclude decision derived from the `!` count.
    ///
    /// Default: false
    pub flip_negate: bool,

    /// Accept `\` as a path separator in patterns.
    ///
    /// Backslashes are rewritten to `/` before brace expansion, so escaping
    /// with `\` is unavailable in this mode.
    ///
    /// Default: true on Windows, false elsewhere
    pub windows_paths: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            dot: true,
            brace_expansion: true,
            comments: true,
            negation: true,
            flip_negate: false,
            windows_paths: cfg!(windows),
        }
    }
}

impl MatchOptions {
    pub fn new() -> Self { Self::default() }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn dot(mut self, dot: bool) -> Self {
        self.dot = dot;
        self
    }

    pub fn brace_expansion(mut self, brace_expansion: bool) -> Self {
        self.brace_expansion = brace_expansion;
        self
    }

    pub fn comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    pub fn negation(mut self, negation: bool) -> Self {
        self.negation = negation;
        self
    }

    pub fn flip_negate(mut self, flip_negate: bool) -> Self {
        self.flip_negate = flip_negate;
        self
    }

    pub fn windows_paths(mut self, windows_paths: bool) -> Self {
        self.windows_paths = windows_paths;
        self
    }

    /// Whether `\` escapes the next character.
    pub(crate) fn escapes(&self) -> bool { !self.windows_paths }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = MatchOptions::default();
        assert!(!options.case_sensitive);
        assert!(options.dot);
        assert!(options.brace_expansion);
        assert!(options.comments);
        assert!(options.negation);
        assert!(!options.flip_negate);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options: MatchOptions = toml::from_str("case_sensitive = true").unwrap();
        assert!(options.case_sensitive);
        assert!(options.brace_expansion);
        assert!(options.negation);
    }
}
