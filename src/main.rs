use healer_portal::config::PortalConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = PortalConfig::from_env();
    healer_portal::init_logging(&config);

    if let Err(e) = healer_portal::run(config).await {
        log::error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
