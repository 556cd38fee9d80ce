//! Masking of sensitive property values

use lumen_core::config::{MatchKind, RedactionConfig, DEFAULT_MASK};

/// Header that is always masked
pub const AUTHORIZATION: &str = "Authorization";

/// Key predicate of a redaction rule.
///
/// Header names are compared ASCII case-insensitively: `authorization`
/// arriving over HTTP/2 is the same header as `Authorization`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatcher {
    Equals(String),
    StartsWith(String),
}

impl KeyMatcher {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatcher::Equals(name) => key.eq_ignore_ascii_case(name),
            KeyMatcher::StartsWith(prefix) => key
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionRule {
    pub matcher: KeyMatcher,
    pub mask: String,
}

/// Ordered rule set; the first matching rule decides the mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionPolicy {
    rules: Vec<RedactionRule>,
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self::none().with_rule(KeyMatcher::Equals(AUTHORIZATION.to_string()), DEFAULT_MASK)
    }
}

impl RedactionPolicy {
    /// Policy that masks nothing
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Configured rules followed by the built-in `Authorization` rule.
    ///
    /// Configured rules are additions: they come first so they can give
    /// `Authorization` a mask of its own, but can never remove it.
    pub fn from_config(config: &RedactionConfig) -> Self {
        let mut rules: Vec<RedactionRule> = config
            .rules
            .iter()
            .map(|rule| RedactionRule {
                matcher: match rule.matcher {
                    MatchKind::Equals => KeyMatcher::Equals(rule.header.clone()),
                    MatchKind::StartsWith => KeyMatcher::StartsWith(rule.header.clone()),
                },
                mask: rule.mask.clone().unwrap_or_else(|| config.mask.clone()),
            })
            .collect();
        rules.push(RedactionRule {
            matcher: KeyMatcher::Equals(AUTHORIZATION.to_string()),
            mask: config.mask.clone(),
        });
        Self { rules }
    }

    pub fn with_rule(mut self, matcher: KeyMatcher, mask: impl Into<String>) -> Self {
        self.rules.push(RedactionRule {
            matcher,
            mask: mask.into(),
        });
        self
    }

    pub fn rules(&self) -> &[RedactionRule] {
        &self.rules
    }

    /// Mask for `key`, if any rule matches
    pub fn mask_for(&self, key: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(key))
            .map(|rule| rule.mask.as_str())
    }

    /// Value to emit for `key`: the mask when a rule matches, else `value`
    pub fn apply(&self, key: &str, value: String) -> String {
        match self.mask_for(key) {
            Some(mask) => mask.to_string(),
            None => value,
        }
    }
}
