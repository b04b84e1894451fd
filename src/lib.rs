//! # whois-referral
//!
//! WHOIS lookups that follow registrar referrals.
//!
//! A lookup starts at the registry server for the domain's zone, retries
//! with an exact-match query when the registry lists several records,
//! follows any `Whois Server:` referral lines, and returns every response
//! concatenated. Fields can then be pulled out of the free text with
//! [`parse_record`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whois_referral::WhoisClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WhoisClient::new()?;
//!     let record = client.get_record("example.com").await?;
//!
//!     println!("{}", record.text);
//!     println!("Registrar: {:?}", record.fields().get("Registrar"));
//!
//!     Ok(())
//! }
//! ```
//!
//! Availability is a heuristic; see [`availability`] for its limits.

pub mod availability;
pub mod config;
pub mod errors;
pub mod parser;
pub mod referral;
pub mod transport;
pub mod whois;
pub mod zones;

// Re-export main types for easy access
pub use availability::is_available_from_text;
pub use config::Config;
pub use errors::WhoisError;
pub use parser::parse_record;
pub use transport::{TcpTransport, Transport};
pub use whois::{Availability, HopFailure, HopStage, Segment, WhoisRecord, WhoisService};
pub use zones::{StaticZoneResolver, ZoneEntry, ZoneResolver};

use std::{collections::HashMap, sync::Arc, time::Duration};

/// Lookup client wired with the bundled zone table and TCP transport.
#[derive(Clone)]
pub struct WhoisClient {
    service: Arc<WhoisService>,
}

impl WhoisClient {
    /// Client using [`Config::load`] (defaults plus environment overrides).
    pub fn new() -> Result<Self, WhoisError> {
        let config = Arc::new(Config::load()?);
        Self::new_with_config(config)
    }

    pub fn new_with_config(config: Arc<Config>) -> Result<Self, WhoisError> {
        Self::new_with_zones(config, Arc::new(StaticZoneResolver::new()))
    }

    pub fn new_with_zones(config: Arc<Config>, zones: Arc<dyn ZoneResolver>) -> Result<Self, WhoisError> {
        let service = Arc::new(WhoisService::new(config, zones)?);
        Ok(Self { service })
    }

    pub fn service(&self) -> &WhoisService {
        &self.service
    }

    pub async fn get_record(&self, domain: &str) -> Result<WhoisRecord, WhoisError> {
        self.service.get_record(domain).await
    }

    pub async fn get_record_with_timeout(&self, domain: &str, timeout: Duration) -> Result<WhoisRecord, WhoisError> {
        self.service.get_record_with_timeout(domain, timeout).await
    }

    pub async fn is_available(&self, domain: &str) -> Availability {
        self.service.is_available(domain).await
    }

    pub fn is_available_from_text(&self, domain: &str, text: &str) -> bool {
        is_available_from_text(domain, text)
    }

    pub fn parse_record(&self, text: &str) -> HashMap<String, String> {
        parse_record(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = WhoisClient::new_with_config(Arc::new(Config::default()));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_zone_is_reported() {
        let client = WhoisClient::new_with_config(Arc::new(Config::default())).unwrap();

        let result = client.get_record("example.invalidzone").await;
        assert!(matches!(result, Err(WhoisError::NoServerFound(_))));

        let availability = client.is_available("example.invalidzone").await;
        assert!(availability.available);
        assert!(matches!(availability.error, Some(WhoisError::NoServerFound(_))));
    }

    #[test]
    fn test_pure_helpers() {
        let client = WhoisClient::new_with_config(Arc::new(Config::default())).unwrap();
        assert!(client.is_available_from_text("d", "no match for d"));
        assert_eq!(client.parse_record("Registrar: R\n").len(), 1);
    }
}
