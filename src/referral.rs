//! Detection of registry hints: "several records matched" and
//! "ask this registrar server instead".
//!
//! Neither is standardised. Both are de-facto registry idioms and are treated
//! as best-effort hints by the lookup service.

use crate::{
    config::{Config, EXACT_MATCH_PREFIX},
    errors::WhoisError,
};
use regex::Regex;

#[derive(Debug, Clone)]
pub struct ReferralScanner {
    disambiguation_marker: String,
    referral_anchor: String,
    referral: Regex,
}

impl ReferralScanner {
    pub fn new(config: &Config) -> Result<Self, WhoisError> {
        let referral = Regex::new(&format!("{}(.*)", regex::escape(&config.referral_marker)))?;
        Ok(Self {
            disambiguation_marker: config.disambiguation_marker.clone(),
            referral_anchor: config.referral_anchor.clone(),
            referral,
        })
    }

    /// True when the registry answered with several candidate records.
    pub fn needs_disambiguation(&self, text: &str) -> bool {
        !self.disambiguation_marker.is_empty() && text.contains(&self.disambiguation_marker)
    }

    /// Referred servers in the order they appear.
    ///
    /// Scanning starts at the first `Domain Name: ` line, or at the top when
    /// there is none, so that registry boilerplate above the record is skipped.
    /// Duplicates are kept.
    pub fn referral_servers(&self, text: &str) -> Vec<String> {
        let start = text.find(&self.referral_anchor).unwrap_or(0);

        self.referral
            .captures_iter(&text[start..])
            .filter_map(|caps| caps.get(1))
            .map(|host| host.as_str().trim())
            .filter(|host| host.len() > 1)
            .map(str::to_string)
            .collect()
    }
}

/// Query asking the registry for the exact record only.
pub fn exact_match_query(domain: &str) -> String {
    format!("{}{}", EXACT_MATCH_PREFIX, domain)
}
