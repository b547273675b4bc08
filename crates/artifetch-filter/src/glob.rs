use regex::{Regex, RegexBuilder};

use crate::{Error, MatchOptions, Result};

/// A single brace-free glob compiled to an anchored regex.
///
/// Supported syntax: `*` (any run within a segment), `**` as a whole segment
/// (any number of segments), `?`, character classes `[...]` / `[!...]`, and
/// `\` escapes unless Windows separators are enabled.
#[derive(Clone, Debug)]
pub struct Glob {
    source: String,
    regex: Regex,
}

impl Glob {
    pub fn new(pattern: &str, options: &MatchOptions) -> Result<Self> {
        let body = translate(pattern, options);
        let regex = RegexBuilder::new(&format!("^{body}$"))
            .case_insensitive(!options.case_sensitive)
            .build()
            .map_err(|source| Error::InvalidGlob {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, path: &str) -> bool { self.regex.is_match(path) }

    pub fn as_str(&self) -> &str { &self.source }
}

enum Part {
    Globstar,
    Segment(String),
}

fn translate(pattern: &str, options: &MatchOptions) -> String {
    let mut parts: Vec<Part> = Vec::new();
    for segment in pattern.split('/') {
        if segment == "**" {
            if !matches!(parts.last(), Some(Part::Globstar)) {
                parts.push(Part::Globstar);
            }
        } else {
            parts.push(Part::Segment(translate_segment(segment, options)));
        }
    }

    let any_segment = if options.dot { "[^/]+" } else { "[^/.][^/]*" };
    let count = parts.len();
    let mut out = String::new();

    for (i, part) in parts.iter().enumerate() {
        let first = i == 0;
        let last = i + 1 == count;
        match part {
            Part::Globstar if first && last => {
                out.push_str(&format!("{any_segment}(?:/{any_segment})*"));
            }
            Part::Globstar if last => out.push_str(&format!("(?:/{any_segment})+")),
            Part::Globstar => {
                if !first {
                    out.push('/');
                }
                // consumes the separator before the next segment
                out.push_str(&format!("(?:{any_segment}/)*"));
            }
            Part::Segment(fragment) => {
                if !first && matches!(parts[i - 1], Part::Segment(_)) {
                    out.push('/');
                }
                out.push_str(fragment);
            }
        }
    }
    out
}

fn translate_segment(segment: &str, options: &MatchOptions) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let at_start = i == 0;
        let guard_dot = at_start && !options.dot;
        match chars[i] {
            '\\' if options.escapes() && i + 1 < chars.len() => {
                out.push_str(&regex::escape(&chars[i + 1].to_string()));
                i += 2;
            }
            '*' => {
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                if guard_dot {
                    // a leading `*` may only match empty when what follows is not a dot
                    if chars.get(i) == Some(&'.') {
                        out.push_str("[^/.][^/]*");
                    } else {
                        out.push_str("(?:[^/.][^/]*)?");
                    }
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => {
                out.push_str(if guard_dot { "[^/.]" } else { "[^/]" });
                i += 1;
            }
            '[' => match parse_class(&chars, i, options) {
                Some((class, next)) => {
                    if guard_dot {
                        out.push_str(&format!("[{class}&&[^/.]]"));
                    } else {
                        out.push_str(&class);
                    }
                    i = next;
                }
                None => {
                    out.push_str(r"\[");
                    i += 1;
                }
            },
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }
    out
}

/// Parse `[...]` starting at `open`; returns the regex class and the index
/// after the closing bracket, or `None` when the class is unterminated.
fn parse_class(chars: &[char], open: usize, options: &MatchOptions) -> Option<(String, usize)> {
    let mut i = open + 1;
    let negated = matches!(chars.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }

    let content_start = i;
    let mut content = String::new();
    while i < chars.len() {
        let c = chars[i];
        // a `]` directly after the opening bracket is literal
        if c == ']' && i > content_start {
            let class = if negated {
                format!("[^/{content}]")
            } else {
                format!("[{content}]")
            };
            return Some((class, i + 1));
        }
        if c == '\\' && options.escapes() && i + 1 < chars.len() {
            i += 1;
            push_class_literal(&mut content, chars[i]);
        } else if c == '-' {
            content.push(c);
        } else {
            push_class_literal(&mut content, c);
        }
        i += 1;
    }
    None
}

/// Push `c` as a literal member of a regex character class. Only characters
/// with a meaning inside a class are escaped.
fn push_class_literal(out: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
        out.push('\\');
    }
    out.push(c);
}
