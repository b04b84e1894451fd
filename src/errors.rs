use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WhoisError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("No whois server found for {0}")]
    NoServerFound(String),

    #[error("Connection to {server} failed: {source}")]
    ConnectionError {
        server: String,
        #[source]
        source: io::Error,
    },

    #[error("Transport error from {server}: {source}")]
    TransportError {
        server: String,
        #[source]
        source: io::Error,
    },

    #[error("Response from {server} exceeded {limit} bytes")]
    ResponseTooLarge { server: String, limit: usize },

    #[error("Lookup cancelled")]
    Cancelled,

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

impl WhoisError {
    pub(crate) fn connect(server: &str, source: io::Error) -> Self {
        WhoisError::ConnectionError {
            server: server.to_string(),
            source,
        }
    }

    pub(crate) fn transport(server: &str, source: io::Error) -> Self {
        WhoisError::TransportError {
            server: server.to_string(),
            source,
        }
    }

    pub(crate) fn timed_out(server: &str, connecting: bool) -> Self {
        let source = io::Error::new(io::ErrorKind::TimedOut, "whois query timed out");
        if connecting {
            Self::connect(server, source)
        } else {
            Self::transport(server, source)
        }
    }

    /// Per-attempt failures of a single TCP round-trip.
    ///
    /// The referral chain swallows these for every hop except the primary one.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            WhoisError::ConnectionError { .. }
                | WhoisError::TransportError { .. }
                | WhoisError::ResponseTooLarge { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            WhoisError::ConnectionError { source, .. } | WhoisError::TransportError { source, .. } => {
                source.kind() == io::ErrorKind::TimedOut
            }
            _ => false,
        }
    }
}
