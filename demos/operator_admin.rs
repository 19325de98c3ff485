//! List operators from an admin API and toggle the first one's status.
//!
//! Usage: `cargo run --example operator_admin -- http://localhost:8080 <token>`

use tether::fetch::FetchOptions;
use tether::operator::{ClientConfig, OperatorClient, OperatorQuery};
use tether::{use_fetch, RemoteFetchState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let base_url = args.next().unwrap_or_else(|| "http://localhost:8080".to_string());
    let token = args.next().unwrap_or_default();

    let client = OperatorClient::new(
        ClientConfig::new(&base_url).header("Authorization", format!("Bearer {}", token)),
    )?;

    let page = client.list(&OperatorQuery::page(1, 10)).await?;
    println!("{} operators in total", page.total);
    for op in &page.list {
        println!("  {:<12} {:<20} {:?}", op.operator_code, op.operator_name, op.status);
    }

    if let Some(first) = page.list.first() {
        client
            .update_status(&first.operator_code, first.status.toggled())
            .await?;
        println!("toggled {}", first.operator_code);
    }

    // One-off health check through the reactive fetch state.
    let health: RemoteFetchState<serde_json::Value> = use_fetch(
        format!("{}/api/health", base_url),
        FetchOptions::new().immediate(false),
    );
    match health.refetch().await {
        Ok(body) => println!("health: {}", body),
        Err(err) => println!("health check failed: {}", err),
    }
    println!("loading={} error={:?}", health.loading().get(), health.error().get());

    Ok(())
}
