use crate::{Error, Result};

const MAX_EXPANSIONS: usize = 4096;

/// Expand `{a,b,c}` alternations into the cartesian set of literal patterns.
///
/// Nested groups are expanded recursively. A group without a top-level
/// comma, or an unbalanced brace, stays literal. When `escapes` is set,
/// `\{`, `\}` and `\,` never take part in expansion.
///
/// Duplicate expansions are dropped; first occurrence order is kept.
///
/// ```
/// use artifetch_filter::expand_braces;
///
/// let expanded = expand_braces("a/{b,c}.txt", true).unwrap();
/// assert_eq!(expanded, vec!["a/b.txt", "a/c.txt"]);
/// ```
pub fn expand_braces(pattern: &str, escapes: bool) -> Result<Vec<String>> {
    let mut out = Vec::new();
    expand_into(pattern, escapes, &mut out, pattern)?;
    Ok(out)
}

fn expand_into(pattern: &str, escapes: bool, out: &mut Vec<String>, original: &str) -> Result<()> {
    let Some(group) = find_group(pattern, escapes) else {
        if !out.iter().any(|p| p == pattern) {
            if out.len() >= MAX_EXPANSIONS {
                return Err(Error::TooManyExpansions {
                    pattern: original.to_string(),
                    limit: MAX_EXPANSIONS,
                });
            }
            out.push(pattern.to_string());
        }
        return Ok(());
    };

    let prefix = &pattern[..group.open];
    let suffix = &pattern[group.close + 1..];
    for alternative in group.alternatives(pattern) {
        let candidate = format!("{prefix}{alternative}{suffix}");
        expand_into(&candidate, escapes, out, original)?;
    }
    Ok(())
}

struct Group {
    open: usize,
    close: usize,
    /// Byte offsets of top-level commas.
    commas: Vec<usize>,
}

impl Group {
    fn alternatives<'a>(&self, pattern: &'a str) -> Vec<&'a str> {
        let mut parts = Vec::with_capacity(self.commas.len() + 1);
        let mut start = self.open + 1;
        for &comma in &self.commas {
            parts.push(&pattern[start..comma]);
            start = comma + 1;
        }
        parts.push(&pattern[start..self.close]);
        parts
    }
}

/// Find the first balanced group that contains a top-level comma.
fn find_group(pattern: &str, escapes: bool) -> Option<Group> {
    let bytes = pattern.as_bytes();
    let mut search = 0;

    while let Some(open) = next_unescaped(bytes, search, b'{', escapes) {
        let mut depth = 0usize;
        let mut commas = Vec::new();
        let mut i = open;
        let mut close = None;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' if escapes => i += 1,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                b',' if depth == 1 => commas.push(i),
                _ => {}
            }
            i += 1;
        }

        match close {
            Some(close) if !commas.is_empty() => return Some(Group { open, close, commas }),
            _ => search = open + 1,
        }
    }
    None
}

fn next_unescaped(bytes: &[u8], from: usize, needle: u8, escapes: bool) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if escapes => i += 2,
            b if b == needle => return Some(i),
            _ => i += 1,
        }
    }
    None
}
