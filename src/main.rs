use mcp_component_server::config::ServerConfig;
use mcp_component_server::server::McpServer;
use mcp_component_server::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mcp-component-server: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let state = match AppState::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("mcp-component-server: startup error: {e}");
            std::process::exit(1);
        }
    };

    let mut server = McpServer::new(state);
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}
