use crate::{config::Config, errors::WhoisError};
use async_trait::async_trait;
use std::{future::Future, io, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::{timeout_at, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One WHOIS round-trip: send a query line, read until the server hangs up.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn query(
        &self,
        server: &str,
        query: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, WhoisError>;
}

/// Plain TCP transport. The timeout covers the whole attempt: connect, write
/// and every read share one deadline.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    port: u16,
    max_response_size: usize,
    buffer_size: usize,
}

enum Interrupted {
    Cancelled,
    TimedOut,
}

async fn guarded<T, F>(fut: F, deadline: Instant, cancel: &CancellationToken) -> Result<io::Result<T>, Interrupted>
where
    F: Future<Output = io::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupted::Cancelled),
        res = timeout_at(deadline, fut) => res.map_err(|_| Interrupted::TimedOut),
    }
}

impl TcpTransport {
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.whois_port,
            max_response_size: config.max_response_size,
            buffer_size: config.buffer_size,
        }
    }

    async fn connect(&self, server: &str, deadline: Instant, cancel: &CancellationToken) -> Result<TcpStream, WhoisError> {
        match guarded(TcpStream::connect((server, self.port)), deadline, cancel).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY: {}", e);
                }
                Ok(stream)
            }
            Ok(Err(e)) => Err(WhoisError::connect(server, e)),
            Err(Interrupted::TimedOut) => Err(WhoisError::timed_out(server, true)),
            Err(Interrupted::Cancelled) => Err(WhoisError::Cancelled),
        }
    }

    async fn exchange(
        &self,
        stream: &mut TcpStream,
        server: &str,
        query: &str,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, WhoisError> {
        let interrupted = |i: Interrupted| match i {
            Interrupted::TimedOut => WhoisError::timed_out(server, false),
            Interrupted::Cancelled => WhoisError::Cancelled,
        };

        let query_line = format!("{}\r\n", query);
        guarded(stream.write_all(query_line.as_bytes()), deadline, cancel)
            .await
            .map_err(interrupted)?
            .map_err(|e| WhoisError::transport(server, e))?;

        let mut buffer = vec![0u8; self.buffer_size];
        let mut response = Vec::new();

        loop {
            let n = guarded(stream.read(&mut buffer), deadline, cancel)
                .await
                .map_err(interrupted)?
                .map_err(|e| WhoisError::transport(server, e))?;
            if n == 0 {
                break;
            }
            response.extend_from_slice(&buffer[..n]);
            if response.len() > self.max_response_size {
                return Err(WhoisError::ResponseTooLarge {
                    server: server.to_string(),
                    limit: self.max_response_size,
                });
            }
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn query(
        &self,
        server: &str,
        query: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, WhoisError> {
        let deadline = Instant::now() + timeout;

        debug!("Querying {}:{} for {}", server, self.port, query);
        let mut stream = self.connect(server, deadline, cancel).await?;

        // The stream is dropped, and the socket closed, on every path out of here.
        let response = self.exchange(&mut stream, server, query, deadline, cancel).await?;
        debug!("Read {} bytes from {}", response.len(), server);

        // Registries are not consistent about UTF-8.
        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}
