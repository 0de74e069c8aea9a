use minesweeper_server::config::ServerConfig;
use tracing::info;

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    info!("🚀 Starting Minesweeper session server");

    let config = ServerConfig::from_env();
    let rocket = minesweeper_server::build(config)?;

    info!("📡 Endpoint: GET / (websocket)");
    let _ = rocket.launch().await?;
    Ok(())
}
