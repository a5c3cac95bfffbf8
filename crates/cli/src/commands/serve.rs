//! `ikms serve`: start the HTTP API server.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, _) = super::load_provider()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("IKMS Gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:      {}", config.default_model);
    println!("   Uploads:    {} (cleared on start)", config.gateway.upload_dir);

    ikms_gateway::start(config).await?;

    Ok(())
}
