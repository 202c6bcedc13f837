//! Regex pattern lists used for process, environment and network filtering.
//!
//! A `Matcher` is compiled once from configuration and is then read-only, so
//! it can be shared freely between rayon workers.

use regex::Regex;

use crate::error::ConfigError;

/// An ordered list of compiled patterns; a name matches if any pattern does.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    patterns: Vec<Regex>,
}

impl Matcher {
    /// Compiles every pattern, failing on the first invalid one.
    ///
    /// `list` names the configuration list in error messages.
    pub fn new<S: AsRef<str>>(list: &'static str, patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| ConfigError::InvalidPattern {
                    list,
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// A matcher with no patterns. Matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True iff any pattern matches `name`. An empty matcher denies everything.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }

    /// Like `matches`, but an empty matcher lets everything through.
    pub fn matches_or_empty(&self, name: &str) -> bool {
        self.is_empty() || self.matches(name)
    }
}
