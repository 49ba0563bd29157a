//! Route matching predicates.
//!
//! A rule is one or more alternatives separated by `|`. Each alternative is a
//! glob matched against the whole route: `*` matches any run of characters
//! (including none) and `?` matches exactly one character. Whitespace around
//! alternatives is ignored, empty alternatives never match.
//!
//! ```text
//! "home"              matches "home" only
//! "products/*"        matches "products/42", "products/"
//! "home | settings*"  matches "home", "settings/profile"
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Route predicate attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PageRule {
    source: String,
    alternatives: Vec<Vec<char>>,
}

impl PageRule {
    /// Parse a rule. Parsing never fails; a rule with no usable alternatives
    /// matches nothing.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let alternatives = source
            .split('|')
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(|alt| alt.chars().collect())
            .collect();
        Self { source, alternatives }
    }

    /// Rule as received from the gateway.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if any alternative matches the whole `route`.
    pub fn matches(&self, route: &str) -> bool {
        let route: Vec<char> = route.chars().collect();
        self.alternatives.iter().any(|pattern| glob_match(pattern, &route))
    }
}

impl From<String> for PageRule {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for PageRule {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<PageRule> for String {
    fn from(value: PageRule) -> Self {
        value.source
    }
}

impl fmt::Display for PageRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Iterative glob match with single-star backtracking. Linear in the common
/// case, worst case O(pattern * text).
fn glob_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            },
            Some('?') => {
                p += 1;
                t += 1;
            },
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            },
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                },
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn literal_matches_whole_route() {
        let rule = PageRule::new("home");
        assert!(rule.matches("home"));
        assert!(!rule.matches("home/feed"));
        assert!(!rule.matches("my-home"));
    }

    #[test]
    fn star_matches_any_suffix() {
        let rule = PageRule::new("products/*");
        assert!(rule.matches("products/42"));
        assert!(rule.matches("products/"));
        assert!(!rule.matches("product"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        let rule = PageRule::new("step-?");
        assert!(rule.matches("step-1"));
        assert!(!rule.matches("step-12"));
    }

    #[test]
    fn alternatives() {
        let rule = PageRule::new("home | settings*");
        assert!(rule.matches("home"));
        assert!(rule.matches("settings/profile"));
        assert!(!rule.matches("cart"));
    }

    #[test]
    fn empty_rule_matches_nothing() {
        assert!(!PageRule::new("").matches(""));
        assert!(!PageRule::new(" | ").matches("home"));
    }

    #[test]
    fn backtracking_star() {
        let rule = PageRule::new("*a*b");
        assert!(rule.matches("xaxxb"));
        assert!(rule.matches("ab"));
        assert!(!rule.matches("xaxxbc"));
    }

    proptest! {
        #[test]
        fn prop_star_matches_everything(route in ".{0,40}") {
            prop_assert!(PageRule::new("*").matches(&route));
        }

        #[test]
        fn prop_literal_matches_itself(route in "[a-z/]{1,20}") {
            prop_assert!(PageRule::new(route.clone()).matches(&route));
        }
    }
}
