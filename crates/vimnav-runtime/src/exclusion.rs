#![forbid(unsafe_code)]

//! Per-site disabling through URL glob patterns.
//!
//! A pattern is a glob over the full page URL: `*` matches any run of
//! characters (including `/`), `?` matches exactly one, and everything else
//! is literal. Patterns are anchored at both ends, so `*://mail.example.com/*`
//! matches every page on that host and `https://example.com` matches only the
//! bare URL.
//!
//! Patterns that fail to compile are skipped and logged; one bad entry never
//! disables the rest.

use regex::Regex;

/// Compiled `excludedUrls` list.
#[derive(Debug, Clone, Default)]
pub struct UrlExclusion {
    patterns: Vec<Regex>,
}

impl UrlExclusion {
    /// Compile every valid pattern.
    #[must_use]
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| {
                let pattern = pattern.as_ref();
                match glob_to_regex(pattern) {
                    Ok(regex) => Some(regex),
                    Err(err) => {
                        tracing::warn!(
                            target: "vimnav.engine",
                            pattern,
                            error = %err,
                            "skipping invalid excluded URL pattern"
                        );
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    /// Whether any pattern matches `url`.
    #[must_use]
    pub fn is_excluded(&self, url: &str) -> bool {
        self.patterns.iter().any(|regex| regex.is_match(url))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Translate one glob into an anchored regex.
pub fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut source = String::with_capacity(glob.len() * 2 + 2);
    source.push('^');
    let mut buf = [0u8; 4];
    for c in glob.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push('$');
    Regex::new(&source)
}
