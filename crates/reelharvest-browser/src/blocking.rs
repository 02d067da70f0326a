//! Request blocking decided when a session is created.

use reelharvest_core::BrowserConfig;

/// Which intercepted requests a session aborts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPolicy {
    resource_types: Vec<String>,
    url_patterns: Vec<String>,
}

impl BlockPolicy {
    /// Block the given resource types (case-insensitive) and URL substrings.
    #[must_use]
    pub fn new(resource_types: &[String], url_patterns: &[String]) -> Self {
        Self {
            resource_types: resource_types
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            url_patterns: url_patterns
                .iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self::new(&config.blocked_resource_types, &config.blocked_url_patterns)
    }

    /// True when nothing is ever blocked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resource_types.is_empty() && self.url_patterns.is_empty()
    }

    #[must_use]
    pub fn should_block(&self, resource_type: &str, url: &str) -> bool {
        let resource_type = resource_type.to_ascii_lowercase();
        if self.resource_types.iter().any(|t| *t == resource_type) {
            return true;
        }

        let url = url.to_ascii_lowercase();
        self.url_patterns.iter().any(|p| url.contains(p.as_str()))
    }
}
