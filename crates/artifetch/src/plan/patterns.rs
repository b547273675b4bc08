use artifetch_filter::MatchOptions;

/// The pattern list a download actually filters with.
///
/// A list with no effective entry (all blank) selects everything.
pub fn effective_patterns(patterns: &[String]) -> Vec<String> {
    if patterns.iter().all(|p| p.trim().is_empty()) {
        vec!["**".to_string()]
    } else {
        patterns.to_vec()
    }
}

/// Prefix every pattern with `<artifact>/` so it applies inside that
/// artifact's subtree of a combined download.
///
/// Leading `!` negations stay in front when `options` treats them as
/// negations; otherwise they are part of the path. Comments (when enabled)
/// and blank lines pass through untouched.
pub fn scope_patterns(artifact: &str, patterns: &[String], options: &MatchOptions) -> Vec<String> {
    patterns
        .iter()
        .map(|raw| {
            let pattern = raw.trim();
            if pattern.is_empty() || (options.comments && pattern.starts_with('#')) {
                return raw.clone();
            }
            let (negations, body) = if options.negation {
                let body = pattern.trim_start_matches('!');
                (&pattern[..pattern.len() - body.len()], body.trim_start())
            } else {
                ("", pattern)
            };
            let body = body.trim_start_matches('/');
            format!("{negations}{artifact}/{body}")
        })
        .collect()
}
