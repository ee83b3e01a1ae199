use std::net::SocketAddr;

use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = fashionbrain_telemetry::init(None) {
        eprintln!("failed to initialise logging: {}", err);
    }

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "mock backend listening");
    println!("mock backend listening on http://{}", addr);

    fashionbrain_mock::run(listener).await?;
    Ok(())
}
