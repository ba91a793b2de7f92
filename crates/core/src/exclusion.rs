//! Never-cache URL patterns.
//!
//! Requests whose URL matches any pattern bypass the worker entirely so that
//! admin, login and preview pages always come from the live site.

use regex::Regex;

use crate::Error;

/// Patterns excluded by default: the WordPress dashboard, the login page and
/// post previews.
pub const DEFAULT_NEVER_CACHE: &[&str] = &[r"/wp-admin", r"/wp-login", r"preview=true"];

/// Ordered set of compiled exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<Regex>,
}

impl ExclusionSet {
    /// Compile a list of regular expressions.
    ///
    /// Patterns are unanchored, so `/wp-admin` matches anywhere in the URL.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()).map_err(|e| Error::InvalidPattern(format!("{}: {e}", p.as_ref()))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// The default WordPress exclusion set.
    pub fn wordpress() -> Self {
        // The defaults are literal paths and always compile.
        Self::new(DEFAULT_NEVER_CACHE).unwrap_or_default()
    }

    /// First pattern matching `url`, if any.
    pub fn first_match(&self, url: &str) -> Option<&str> {
        self.patterns.iter().find(|p| p.is_match(url)).map(Regex::as_str)
    }

    pub fn matches(&self, url: &str) -> bool {
        self.first_match(url).is_some()
    }

    /// Pattern sources in declaration order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wordpress_defaults() {
        let set = ExclusionSet::wordpress();
        assert_eq!(set.len(), 3);
        assert!(set.matches("https://example.com/wp-admin/edit.php"));
        assert!(set.matches("https://example.com/wp-login.php?action=lostpassword"));
        assert!(set.matches("https://example.com/?p=42&preview=true"));
        assert!(!set.matches("https://example.com/about/"));
    }

    #[test]
    fn test_first_match_reports_pattern() {
        let set = ExclusionSet::wordpress();
        assert_eq!(set.first_match("https://example.com/wp-login.php"), Some("/wp-login"));
        assert_eq!(set.first_match("https://example.com/"), None);
    }

    #[test]
    fn test_invalid_pattern() {
        let result = ExclusionSet::new(&["(unclosed"]);
        assert!(matches!(result, Err(Error::InvalidPattern(_))));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = ExclusionSet::new::<&str>(&[]).unwrap();
        assert!(set.is_empty());
        assert!(!set.matches("https://example.com/wp-admin/"));
    }

    #[test]
    fn test_sources_preserve_order() {
        let set = ExclusionSet::new(&["/checkout", "/cart"]).unwrap();
        assert_eq!(set.sources().collect::<Vec<_>>(), vec!["/checkout", "/cart"]);
    }
}
