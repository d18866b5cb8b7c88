use anyhow::{Context, Result};

use sessionguard::config::Config;
use sessionguard::{AuthenticatedClient, Body, ReqwestTransport};

fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Client configured: {:?}", config.client);

    let transport = ReqwestTransport::new(
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
    )
    .context("Failed to create HTTP client")?;

    let client = AuthenticatedClient::new(transport, config.client.clone());

    let body = config.data.clone().map(Body::from).unwrap_or_default();
    let request = http::Request::builder()
        .method(config.method.clone())
        .uri(config.path.as_str())
        .body(body)
        .context("Failed to build request")?;

    tracing::info!(method = %config.method, path = %config.path, host = %client.host(), "Sending request");
    let response = client.execute(request).context("Request failed")?;

    let status = response.status();
    tracing::info!(status = %status, "Response received");
    println!("{}", status);
    println!("{}", String::from_utf8_lossy(response.body()));

    if config.logout {
        let request = http::Request::builder()
            .method(http::Method::DELETE)
            .uri(sessionguard::auth::LOGIN_PATH)
            .body(Body::Empty)
            .context("Failed to build logout request")?;
        let response = client.execute(request).context("Logout failed")?;
        tracing::info!(status = %response.status(), "Logged out");
    }

    if !status.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
