//! Severity filters consulted before any extraction work

use lumen_core::config::parse_level;
use lumen_core::{LumenConfig, Severity};

/// Decides whether events of `severity` from `category` are recorded
pub trait SeverityFilter: Send + Sync {
    fn is_enabled(&self, category: &str, severity: Severity) -> bool;
}

impl<F> SeverityFilter for F
where
    F: Fn(&str, Severity) -> bool + Send + Sync,
{
    fn is_enabled(&self, category: &str, severity: Severity) -> bool {
        self(category, severity)
    }
}

/// Records everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl SeverityFilter for AllowAll {
    fn is_enabled(&self, _category: &str, _severity: Severity) -> bool {
        true
    }
}

/// Records events at or above a fixed severity, for every category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimumSeverity(pub Severity);

impl Default for MinimumSeverity {
    fn default() -> Self {
        Self(Severity::Information)
    }
}

impl SeverityFilter for MinimumSeverity {
    fn is_enabled(&self, _category: &str, severity: Severity) -> bool {
        severity >= self.0
    }
}

/// Per-category minimum severities resolved once from configuration
#[derive(Debug, Clone)]
pub struct ConfigFilter {
    default: Option<Severity>,
    // Longest prefix first
    categories: Vec<(String, Option<Severity>)>,
}

impl ConfigFilter {
    pub fn new(config: &LumenConfig) -> Self {
        if !config.enabled {
            return Self {
                default: None,
                categories: Vec::new(),
            };
        }

        let mut categories: Vec<(String, Option<Severity>)> = config
            .log_level
            .categories
            .iter()
            .map(|(prefix, level)| (prefix.clone(), parse_level(level)))
            .collect();
        categories.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            default: parse_level(&config.log_level.default),
            categories,
        }
    }

    /// Effective minimum for `category`; `None` disables the category
    pub fn min_level_for(&self, category: &str) -> Option<Severity> {
        self.categories
            .iter()
            .find(|(prefix, _)| category.starts_with(prefix.as_str()))
            .map(|(_, level)| *level)
            .unwrap_or(self.default)
    }
}

impl SeverityFilter for ConfigFilter {
    fn is_enabled(&self, category: &str, severity: Severity) -> bool {
        self.min_level_for(category)
            .is_some_and(|minimum| severity >= minimum)
    }
}
