// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use diagram_relay::api;
use diagram_relay::config;
use diagram_relay::prompt::MermaidPromptBuilder;
use diagram_relay::upstream::ReqwestHttpSender;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "diagram-relay", about = "Streaming Mermaid extraction relay")]
struct Cli {
    /// Path to the diagram-relay.yaml config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, env = "DIAGRAM_RELAY_CONFIG")]
    config: String,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "DIAGRAM_RELAY_HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = 9810, env = "DIAGRAM_RELAY_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let addr = SocketAddr::new(cli.host, cli.port);
    tracing::info!(%addr, "diagram-relay starting");

    let source = config::FileSource {
        path: std::path::PathBuf::from(cli.config),
    };
    let config = match config::load_config(&source) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        version = %config.version,
        config_hash = %config.config_hash,
        fallback_configured = config.upstream.api_url.is_some(),
        password_configured = config.access_password.is_some(),
        fence_language = %config.stream.fence_language,
        "config loaded"
    );

    let client = match reqwest::Client::builder().build() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };
    let sender = Arc::new(ReqwestHttpSender::new(client));
    let prompts = Arc::new(MermaidPromptBuilder::new(config.prompt.clone()));

    let app = api::build_router(api::AppState::new(config, sender, prompts));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "diagram-relay listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
