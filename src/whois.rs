use crate::{
    availability::is_available_from_text,
    config::Config,
    errors::WhoisError,
    parser::parse_record,
    referral::{exact_match_query, ReferralScanner},
    transport::{TcpTransport, Transport},
    zones::{server_for_entry, ZoneResolver},
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Serialize, Serializer};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

fn serialize_error<S: Serializer>(error: &WhoisError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

fn serialize_optional_error<S: Serializer>(error: &Option<WhoisError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => s.collect_str(error),
        None => s.serialize_none(),
    }
}

/// One successful round-trip that contributed to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub server: String,
    pub query: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HopStage {
    /// The first query, sent to the zone's server.
    Primary,
    /// The exact-match retry after the registry reported several matches.
    Disambiguation,
    /// A query to a server named by a `Whois Server:` line.
    Referral,
}

/// A hop that failed without failing the lookup.
#[derive(Debug, Serialize)]
pub struct HopFailure {
    pub stage: HopStage,
    pub server: String,
    pub query: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: WhoisError,
}

/// Result of a lookup: the merged text plus how it was assembled.
#[derive(Debug, Serialize)]
pub struct WhoisRecord {
    pub domain: String,
    /// Server the lookup started at.
    pub server: String,
    /// All successful responses concatenated in fetch order.
    pub text: String,
    pub segments: Vec<Segment>,
    pub failures: Vec<HopFailure>,
    pub queried_at: DateTime<Utc>,
}

impl WhoisRecord {
    /// Some hop failed, so `text` may be missing part of the record, or be
    /// empty when the primary query failed.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn fields(&self) -> HashMap<String, String> {
        parse_record(&self.text)
    }

    pub fn is_available(&self) -> bool {
        is_available_from_text(&self.domain, &self.text)
    }
}

/// Outcome of an availability check.
///
/// When the lookup itself fails, `available` is `true` and `error` carries
/// the failure. When no server answered at all, `available` is `false` and
/// `answered` is `false`. Neither case is evidence either way, so callers
/// that care should check [`Availability::is_conclusive`].
#[derive(Debug, Serialize)]
pub struct Availability {
    pub available: bool,
    pub answered: bool,
    #[serde(serialize_with = "serialize_optional_error")]
    pub error: Option<WhoisError>,
}

impl Availability {
    pub fn is_conclusive(&self) -> bool {
        self.error.is_none() && self.answered
    }
}

pub struct WhoisService {
    config: Arc<Config>,
    zones: Arc<dyn ZoneResolver>,
    transport: Arc<dyn Transport>,
    scanner: ReferralScanner,
}

impl WhoisService {
    /// Service talking plain TCP to real WHOIS servers.
    pub fn new(config: Arc<Config>, zones: Arc<dyn ZoneResolver>) -> Result<Self, WhoisError> {
        let transport = Arc::new(TcpTransport::new(&config));
        Self::with_transport(config, zones, transport)
    }

    pub fn with_transport(
        config: Arc<Config>,
        zones: Arc<dyn ZoneResolver>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, WhoisError> {
        let scanner = ReferralScanner::new(&config)?;

        debug!(
            "WhoisService initialized (timeout {:?}, max referrals {}, concurrent referrals {})",
            config.timeout(), config.max_referrals, config.concurrent_referrals
        );

        Ok(Self { config, zones, transport, scanner })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Server a lookup for `domain` starts at.
    ///
    /// Bare labels (no dot, e.g. a TLD) always go to the root server without
    /// consulting the zone resolver.
    pub fn resolve_server(&self, domain: &str) -> Result<String, WhoisError> {
        if !domain.contains('.') {
            return Ok(self.config.root_server.clone());
        }

        let entry = self
            .zones
            .lookup(domain)
            .ok_or_else(|| WhoisError::NoServerFound(domain.to_string()))?;

        server_for_entry(domain, &entry)
    }

    /// Look up `domain` with the configured timeout.
    pub async fn get_record(&self, domain: &str) -> Result<WhoisRecord, WhoisError> {
        self.get_record_with_timeout(domain, self.config.timeout()).await
    }

    pub async fn get_record_with_timeout(&self, domain: &str, timeout: Duration) -> Result<WhoisRecord, WhoisError> {
        self.get_record_with_cancel(domain, timeout, &CancellationToken::new()).await
    }

    /// Look up `domain`, following registrar referrals.
    ///
    /// `timeout` bounds each individual round-trip, not the whole call.
    ///
    /// Fails only when the domain is empty, when no server is known for it,
    /// or when `cancel` fires. Every failed round-trip, the primary one
    /// included, is recorded in [`WhoisRecord::failures`] and the lookup
    /// carries on with the text it already has.
    pub async fn get_record_with_cancel(
        &self,
        domain: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<WhoisRecord, WhoisError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(WhoisError::InvalidDomain("Empty domain".to_string()));
        }

        let server = self.resolve_server(domain)?;
        info!("Looking up {} at {}", domain, server);

        let mut segments = Vec::new();
        let mut failures = Vec::new();

        let mut primary = Segment {
            server: server.clone(),
            query: domain.to_string(),
            text: String::new(),
        };

        match self.transport.query(&server, domain, timeout, cancel).await {
            Ok(text) => primary.text = text,
            Err(WhoisError::Cancelled) => return Err(WhoisError::Cancelled),
            Err(error) => {
                warn!("Primary query for {} at {} failed: {}", domain, server, error);
                failures.push(HopFailure {
                    stage: HopStage::Primary,
                    server: server.clone(),
                    query: domain.to_string(),
                    error,
                });
            }
        }

        if failures.is_empty() && self.scanner.needs_disambiguation(&primary.text) {
            let query = exact_match_query(domain);
            debug!("{} reported several matches, retrying with {}", server, query);

            match self.transport.query(&server, &query, timeout, cancel).await {
                Ok(text) => primary = Segment { server: server.clone(), query, text },
                Err(WhoisError::Cancelled) => return Err(WhoisError::Cancelled),
                Err(error) => {
                    // The ambiguous listing is discarded either way.
                    warn!("Exact-match retry for {} at {} failed: {}", domain, server, error);
                    primary.text.clear();
                    failures.push(HopFailure { stage: HopStage::Disambiguation, server: server.clone(), query, error });
                }
            }
        }

        let mut referrals = self.scanner.referral_servers(&primary.text);
        if referrals.len() > self.config.max_referrals {
            warn!(
                "{} names {} referral servers for {}, querying the first {}",
                server,
                referrals.len(),
                domain,
                self.config.max_referrals
            );
            referrals.truncate(self.config.max_referrals);
        }

        if failures.is_empty() {
            segments.push(primary);
        }

        for (referral, outcome) in self.query_referrals(referrals, domain, timeout, cancel).await {
            match outcome {
                Ok(text) => {
                    debug!("Referral {} returned {} bytes for {}", referral, text.len(), domain);
                    segments.push(Segment { server: referral, query: domain.to_string(), text });
                }
                Err(WhoisError::Cancelled) => return Err(WhoisError::Cancelled),
                Err(error) => {
                    warn!("Skipping referral {} for {}: {}", referral, domain, error);
                    failures.push(HopFailure {
                        stage: HopStage::Referral,
                        server: referral,
                        query: domain.to_string(),
                        error,
                    });
                }
            }
        }

        let text = segments.iter().map(|s| s.text.as_str()).collect::<String>();

        Ok(WhoisRecord {
            domain: domain.to_string(),
            server,
            text,
            segments,
            failures,
            queried_at: Utc::now(),
        })
    }

    /// Query each referred server, returning outcomes in discovery order.
    async fn query_referrals(
        &self,
        referrals: Vec<String>,
        domain: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Vec<(String, Result<String, WhoisError>)> {
        if self.config.concurrent_referrals {
            let queries = referrals
                .iter()
                .map(|referral| self.transport.query(referral, domain, timeout, cancel));
            let outcomes = join_all(queries).await;
            return referrals.into_iter().zip(outcomes).collect();
        }

        let mut outcomes = Vec::with_capacity(referrals.len());
        for referral in referrals {
            let outcome = self.transport.query(&referral, domain, timeout, cancel).await;
            let cancelled = matches!(outcome, Err(WhoisError::Cancelled));
            outcomes.push((referral, outcome));
            if cancelled {
                break;
            }
        }
        outcomes
    }

    /// Look up `domain` and classify the merged text.
    ///
    /// A failed lookup reports `available: true` alongside the error.
    pub async fn is_available(&self, domain: &str) -> Availability {
        match self.get_record(domain).await {
            Ok(record) => Availability {
                available: record.is_available(),
                answered: !record.segments.is_empty(),
                error: None,
            },
            Err(error) => {
                warn!("Availability of {} unknown: {}", domain, error);
                Availability { available: true, answered: false, error: Some(error) }
            }
        }
    }
}
