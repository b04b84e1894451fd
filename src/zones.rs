//! Zone lookup: which WHOIS endpoint serves a domain's suffix.
//!
//! The service only depends on the [`ZoneResolver`] trait. [`StaticZoneResolver`]
//! is the bundled implementation backed by an embedded suffix table.

use crate::errors::WhoisError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// WHOIS endpoint metadata for one zone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneEntry {
    pub whois_host: Option<String>,
    pub whois_url: Option<String>,
}

impl ZoneEntry {
    pub fn host(host: impl Into<String>) -> Self {
        Self { whois_host: Some(host.into()), whois_url: None }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self { whois_host: None, whois_url: Some(url.into()) }
    }
}

pub trait ZoneResolver: Send + Sync {
    /// Endpoint metadata for the zone `domain` belongs to, or `None` if the
    /// suffix is unknown.
    fn lookup(&self, domain: &str) -> Option<ZoneEntry>;
}

/// Pick the server to query from a zone entry.
///
/// A host wins; otherwise the host component of the URL; otherwise nothing
/// usable is configured for the zone.
pub fn server_for_entry(domain: &str, entry: &ZoneEntry) -> Result<String, WhoisError> {
    if let Some(host) = entry.whois_host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
        return Ok(host.to_string());
    }

    if let Some(raw) = entry.whois_url.as_deref() {
        match Url::parse(raw) {
            Ok(url) => {
                if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
                    debug!("Using host of whois URL {} for {}", raw, domain);
                    return Ok(host.to_string());
                }
            }
            Err(e) => debug!("Unparseable whois URL {} for {}: {}", raw, domain, e),
        }
    }

    Err(WhoisError::NoServerFound(domain.to_string()))
}

#[derive(Clone, Copy)]
struct StaticZone {
    host: Option<&'static str>,
    url: Option<&'static str>,
}

const fn host(host: &'static str) -> StaticZone {
    StaticZone { host: Some(host), url: None }
}

const fn web(url: &'static str) -> StaticZone {
    StaticZone { host: None, url: Some(url) }
}

const NO_WHOIS: StaticZone = StaticZone { host: None, url: None };

static ZONE_TABLE: Lazy<HashMap<&'static str, StaticZone>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Generic TLDs
    map.insert("com", host("whois.verisign-grs.com"));
    map.insert("net", host("whois.verisign-grs.com"));
    map.insert("org", host("whois.pir.org"));
    map.insert("info", host("whois.afilias.net"));
    map.insert("biz", host("whois.nic.biz"));
    map.insert("name", host("whois.nic.name"));
    map.insert("pro", host("whois.registrypro.pro"));
    map.insert("mobi", host("whois.afilias.net"));
    map.insert("edu", host("whois.educause.edu"));
    map.insert("gov", host("whois.dotgov.gov"));
    map.insert("int", host("whois.iana.org"));
    map.insert("aero", host("whois.aero"));
    map.insert("asia", host("whois.nic.asia"));
    map.insert("tel", host("whois.nic.tel"));

    // Newer gTLDs
    map.insert("xyz", host("whois.nic.xyz"));
    map.insert("top", host("whois.nic.top"));
    map.insert("shop", host("whois.nic.shop"));
    map.insert("online", host("whois.nic.online"));
    map.insert("store", host("whois.nic.store"));
    map.insert("site", host("whois.nic.site"));
    map.insert("app", host("whois.nic.google"));
    map.insert("dev", host("whois.nic.google"));
    map.insert("page", host("whois.nic.google"));
    map.insert("tech", host("whois.nic.tech"));
    map.insert("blog", host("whois.nic.blog"));
    map.insert("club", host("whois.nic.club"));
    map.insert("live", host("whois.nic.live"));
    map.insert("cloud", host("whois.nic.cloud"));
    map.insert("io", host("whois.nic.io"));
    map.insert("ai", host("whois.nic.ai"));
    map.insert("me", host("whois.nic.me"));
    map.insert("tv", host("whois.nic.tv"));
    map.insert("cc", host("ccwhois.verisign-grs.com"));

    // Europe
    map.insert("uk", host("whois.nic.uk"));
    map.insert("co.uk", host("whois.nic.uk"));
    map.insert("org.uk", host("whois.nic.uk"));
    map.insert("me.uk", host("whois.nic.uk"));
    map.insert("de", host("whois.denic.de"));
    map.insert("fr", host("whois.afnic.fr"));
    map.insert("it", host("whois.nic.it"));
    map.insert("es", web("https://www.nic.es/"));
    map.insert("nl", host("whois.domain-registry.nl"));
    map.insert("be", host("whois.dns.be"));
    map.insert("ch", host("whois.nic.ch"));
    map.insert("at", host("whois.nic.at"));
    map.insert("se", host("whois.iis.se"));
    map.insert("no", host("whois.norid.no"));
    map.insert("dk", host("whois.dk-hostmaster.dk"));
    map.insert("fi", host("whois.fi"));
    map.insert("pl", host("whois.dns.pl"));
    map.insert("cz", host("whois.nic.cz"));
    map.insert("gr", web("https://grweb.ics.forth.gr/public/whois"));
    map.insert("ru", host("whois.tcinet.ru"));
    map.insert("su", host("whois.tcinet.ru"));
    map.insert("ua", host("whois.ua"));

    // Asia-Pacific
    map.insert("jp", host("whois.jprs.jp"));
    map.insert("co.jp", host("whois.jprs.jp"));
    map.insert("kr", host("whois.kr"));
    map.insert("cn", host("whois.cnnic.cn"));
    map.insert("com.cn", host("whois.cnnic.cn"));
    map.insert("hk", host("whois.hkirc.hk"));
    map.insert("tw", host("whois.twnic.net.tw"));
    map.insert("sg", host("whois.sgnic.sg"));
    map.insert("in", host("whois.registry.in"));
    map.insert("co.in", host("whois.registry.in"));
    map.insert("vn", web("https://www.vnnic.vn/en"));
    map.insert("au", host("whois.auda.org.au"));
    map.insert("com.au", host("whois.auda.org.au"));
    map.insert("nz", host("whois.srs.net.nz"));
    map.insert("co.nz", host("whois.srs.net.nz"));

    // Americas
    map.insert("ca", host("whois.cira.ca"));
    map.insert("us", host("whois.nic.us"));
    map.insert("mx", host("whois.mx"));
    map.insert("br", host("whois.registro.br"));
    map.insert("com.br", host("whois.registro.br"));
    map.insert("ar", host("whois.nic.ar"));
    map.insert("cl", host("whois.nic.cl"));
    map.insert("co", host("whois.nic.co"));
    map.insert("py", NO_WHOIS);

    // Middle East and Africa
    map.insert("il", host("whois.isoc.org.il"));
    map.insert("tr", host("whois.nic.tr"));
    map.insert("ae", host("whois.aeda.net.ae"));
    map.insert("za", host("whois.registry.net.za"));
    map.insert("co.za", host("whois.registry.net.za"));
    map.insert("er", NO_WHOIS);

    map
});

/// Embedded suffix table, optionally extended or overridden per instance.
#[derive(Debug, Clone, Default)]
pub struct StaticZoneResolver {
    overrides: HashMap<String, ZoneEntry>,
}

impl StaticZoneResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `suffix` (e.g. `"com"` or `"co.uk"`).
    pub fn with_entry(mut self, suffix: &str, entry: ZoneEntry) -> Self {
        self.overrides.insert(normalize(suffix), entry);
        self
    }

    fn entry_for_suffix(&self, suffix: &str) -> Option<ZoneEntry> {
        if let Some(entry) = self.overrides.get(suffix) {
            return Some(entry.clone());
        }
        ZONE_TABLE.get(suffix).map(|zone| ZoneEntry {
            whois_host: zone.host.map(str::to_string),
            whois_url: zone.url.map(str::to_string),
        })
    }
}

impl ZoneResolver for StaticZoneResolver {
    fn lookup(&self, domain: &str) -> Option<ZoneEntry> {
        let domain = normalize(domain);
        if domain.is_empty() {
            return None;
        }

        // Longest suffix first so that "co.uk" beats "uk".
        let candidates = std::iter::once(0)
            .chain(domain.match_indices('.').map(|(i, _)| i + 1));
        for start in candidates {
            let suffix = &domain[start..];
            if let Some(entry) = self.entry_for_suffix(suffix) {
                debug!("Zone {} matched for {}", suffix, domain);
                return Some(entry);
            }
        }

        None
    }
}

fn normalize(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}
