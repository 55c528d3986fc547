use crate::config::PolicyConfig;
use crate::policy::ContentPolicy;
use crate::url::matches_wildcard;
use crate::ConfigError;
use regex::{Regex, RegexBuilder};
use url::Url;

/// Policy backed by a restricted-domain list and a blocked-word list
///
/// The word list is compiled once into a single case-insensitive,
/// whole-word regex.
#[derive(Debug, Clone)]
pub struct WordlistPolicy {
    restricted_domains: Vec<String>,
    blocked: Option<Regex>,
    placeholder: String,
}

impl WordlistPolicy {
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        let words: Vec<String> = config
            .blocked_words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();

        let blocked = if words.is_empty() {
            None
        } else {
            let pattern = format!(r"\b(?:{})\b", words.join("|"));
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
            Some(regex)
        };

        Ok(Self {
            restricted_domains: config
                .restricted_domains
                .iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
            blocked,
            placeholder: config.placeholder.clone(),
        })
    }
}

impl Default for WordlistPolicy {
    fn default() -> Self {
        Self {
            restricted_domains: Vec::new(),
            blocked: None,
            placeholder: PolicyConfig::default().placeholder,
        }
    }
}

impl ContentPolicy for WordlistPolicy {
    fn is_restricted(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return true;
        };

        self.restricted_domains
            .iter()
            .any(|pattern| matches_wildcard(pattern, host))
    }

    fn filter_text(&self, text: &str) -> String {
        match &self.blocked {
            Some(regex) => regex
                .replace_all(text, regex::NoExpand(&self.placeholder))
                .into_owned(),
            None => text.to_string(),
        }
    }
}
