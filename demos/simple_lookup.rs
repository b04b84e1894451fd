//! Look up a few domains and print what came back.
//!
//! Run with: cargo run --example simple_lookup -- [domain ...]

use whois_referral::{WhoisClient, WhoisError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "whois_referral=info".into()),
        )
        .init();

    let client = WhoisClient::new()?;

    let mut domains: Vec<String> = std::env::args().skip(1).collect();
    if domains.is_empty() {
        domains = vec!["example.com".into(), "rust-lang.org".into(), "com".into()];
    }

    for domain in &domains {
        println!("\n== {}", domain);

        match client.get_record(domain).await {
            Ok(record) => {
                let hops: Vec<&str> = record.segments.iter().map(|s| s.server.as_str()).collect();
                println!("   Servers: {}", hops.join(" -> "));
                if record.is_partial() {
                    for failure in &record.failures {
                        println!("   Skipped {} ({:?}): {}", failure.server, failure.stage, failure.error);
                    }
                }

                let fields = record.fields();
                for key in ["Registrar", "Creation Date", "Registry Expiry Date", "whois"] {
                    if let Some(value) = fields.get(key) {
                        println!("   {}: {}", key, value);
                    }
                }
                println!("   Available: {}", record.is_available());
            }
            Err(WhoisError::NoServerFound(d)) => println!("   No whois server known for {}", d),
            Err(e) => println!("   Error: {}", e),
        }
    }

    Ok(())
}
