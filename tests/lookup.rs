//! End-to-end lookups against scripted WHOIS servers on loopback.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use tokio_test::assert_ok;
use whois_referral::{Config, HopStage, StaticZoneResolver, WhoisClient, WhoisError, ZoneEntry};

enum Reply {
    Text(&'static str),
    /// Read the query, answer nothing, wait for the client to go away.
    Hang,
}

/// Serves one scripted reply per accepted connection, in order.
struct ScriptedServer {
    port: u16,
    queries: Arc<Mutex<Vec<String>>>,
    accepted: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedServer {
    async fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let queries = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));

        let (q, a, c) = (queries.clone(), accepted.clone(), closed.clone());
        tokio::spawn(async move {
            for reply in replies {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                a.fetch_add(1, Ordering::SeqCst);
                let (q, c) = (q.clone(), c.clone());

                tokio::spawn(async move {
                    let mut line = Vec::new();
                    let mut byte = [0u8; 1];
                    while !line.ends_with(b"\r\n") {
                        match socket.read(&mut byte).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => line.push(byte[0]),
                        }
                    }
                    let query = String::from_utf8_lossy(&line).trim_end().to_string();
                    q.lock().unwrap().push(query);

                    if let Reply::Text(text) = reply {
                        let _ = socket.write_all(text.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }

                    // Count the connection closed once the client hangs up.
                    let mut buf = [0u8; 64];
                    loop {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => continue,
                        }
                    }
                    c.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        Self { port, queries, accepted, closed }
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    async fn wait_until_all_closed(&self, expected: usize) {
        for _ in 0..200 {
            if self.closed.load(Ordering::SeqCst) == expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(self.accepted.load(Ordering::SeqCst), expected);
        assert_eq!(self.closed.load(Ordering::SeqCst), expected);
    }
}

fn client(port: u16) -> WhoisClient {
    let config = Config::default().with_port(port).with_root_server("127.0.0.1");
    let zones = StaticZoneResolver::new().with_entry("test", ZoneEntry::host("127.0.0.1"));
    WhoisClient::new_with_zones(Arc::new(config), Arc::new(zones)).unwrap()
}

const REGISTRY: &str = "Domain Name: EXAMPLE.TEST\r\n\
                        Registry Domain ID: 1234_DOMAIN_TEST\r\n\
                        Registrar WHOIS Server: 127.0.0.1\r\n\
                        Whois Server: 127.0.0.1\r\n";
const REGISTRAR: &str = "Domain Name: example.test\r\n\
                         Registrar: Example Registrar, Inc.\r\n\
                         Registrant Organization: Example Org\r\n";

#[tokio::test]
async fn test_registry_then_registrar() {
    let server = ScriptedServer::start(vec![Reply::Text(REGISTRY), Reply::Text(REGISTRAR)]).await;

    let record = assert_ok!(client(server.port).get_record("example.test").await);

    assert_eq!(record.text, format!("{}{}", REGISTRY, REGISTRAR));
    assert!(!record.is_partial());
    assert_eq!(server.queries(), vec!["example.test", "example.test"]);

    let fields = record.fields();
    assert_eq!(fields.get("Registrar").map(String::as_str), Some("Example Registrar, Inc."));
    assert_eq!(fields.get("Registry Domain ID").map(String::as_str), Some("1234_DOMAIN_TEST"));
    // The registrar's copy comes last and wins.
    assert_eq!(fields.get("Domain Name").map(String::as_str), Some("example.test"));

    server.wait_until_all_closed(2).await;
}

#[tokio::test]
async fn test_exact_match_retry() {
    let listing = "EXAMPLE.TEST.MIRROR.TEST\r\nEXAMPLE.TEST\r\n\r\n\
                   To single out one record, look it up with \"xxx\", where xxx is one of the\r\n\
                   records displayed above.\r\n";
    let exact = "Domain Name: EXAMPLE.TEST\r\nRegistrar: Example Registrar, Inc.\r\n";
    let server = ScriptedServer::start(vec![Reply::Text(listing), Reply::Text(exact)]).await;

    let record = client(server.port).get_record("example.test").await.unwrap();

    assert_eq!(record.text, exact);
    assert_eq!(server.queries(), vec!["example.test", "=example.test"]);
    server.wait_until_all_closed(2).await;
}

#[tokio::test]
async fn test_silent_registrar_is_skipped() {
    let server = ScriptedServer::start(vec![Reply::Text(REGISTRY), Reply::Hang]).await;

    let record = client(server.port)
        .get_record_with_timeout("example.test", Duration::from_millis(300))
        .await
        .unwrap();

    assert_eq!(record.text, REGISTRY);
    assert_eq!(record.failures.len(), 1);
    assert_eq!(record.failures[0].stage, HopStage::Referral);
    assert!(record.failures[0].error.is_timeout());
    server.wait_until_all_closed(2).await;
}

#[tokio::test]
async fn test_every_connection_is_closed() {
    let registry = "Domain Name: EXAMPLE.TEST\r\n\
                    Whois Server: 127.0.0.1\r\n\
                    Whois Server: 127.0.0.1\r\n";
    let server = ScriptedServer::start(vec![Reply::Text(registry), Reply::Hang, Reply::Text(REGISTRAR)]).await;

    let record = client(server.port)
        .get_record_with_timeout("example.test", Duration::from_millis(300))
        .await
        .unwrap();

    assert_eq!(record.text, format!("{}{}", registry, REGISTRAR));
    assert_eq!(record.segments.len(), 2);
    assert_eq!(record.failures.len(), 1);
    server.wait_until_all_closed(3).await;
}

#[tokio::test]
async fn test_bare_label_uses_root_server() {
    let server = ScriptedServer::start(vec![Reply::Text("domain:       TEST\r\nwhois:        whois.nic.test\r\n")]).await;

    let record = client(server.port).get_record("test").await.unwrap();

    assert_eq!(record.server, "127.0.0.1");
    assert_eq!(record.fields().get("whois").map(String::as_str), Some("whois.nic.test"));
    assert_eq!(server.queries(), vec!["test"]);
}

#[tokio::test]
async fn test_unreachable_registry() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let record = assert_ok!(client(port).get_record("example.test").await);
    assert_eq!(record.text, "");
    assert!(record.is_partial());
    assert_eq!(record.failures[0].stage, HopStage::Primary);
    assert!(matches!(record.failures[0].error, WhoisError::ConnectionError { .. }));

    let availability = client(port).is_available("example.test").await;
    assert!(!availability.available);
    assert!(availability.error.is_none());
    assert!(!availability.is_conclusive());
}

#[tokio::test]
async fn test_available_domain() {
    let server = ScriptedServer::start(vec![Reply::Text("No match for \"FREE.TEST\".\r\n>>> Last update of whois database <<<\r\n")]).await;

    let availability = client(server.port).is_available("free.test").await;

    assert!(availability.available);
    assert!(availability.is_conclusive());
}
