//! Gateway HTTP daemon entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use adaptive_llm_gateway::config::GatewayConfig;
use adaptive_llm_gateway::handler::Gateway;
use adaptive_llm_gateway::http::{self, AppState};
use adaptive_llm_gateway::providers::gemini::GeminiClient;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "gatewayd", about = "Adaptive LLM request gateway")]
struct Args {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "GATEWAY_BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind_addr: SocketAddr,

    /// Optional TOML file overlaying the environment-derived configuration.
    #[arg(long, env = "GATEWAY_CONFIG_PATH")]
    config_path: Option<std::path::PathBuf>,

    /// API key for the embedding and generation provider.
    #[arg(long, env = "GEMINI_API_KEY")]
    gemini_api_key: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = GatewayConfig::from_env();
    if let Some(path) = &args.config_path {
        config = config.merge_toml_file(path)?;
    }

    let client = Arc::new(GeminiClient::new(args.gemini_api_key, config.embedding.model.clone()));
    let gateway = Gateway::new(config, client.clone(), client);

    let state = AppState::new(gateway);
    let app = http::app(state);

    tracing::info!(addr = %args.bind_addr, version = %adaptive_llm_gateway::version::version_string(), "starting gateway");

    let listener = tokio::net::TcpListener::bind(args.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
