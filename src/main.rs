use anyhow::Result;
use clap::Parser;
use mcp_github_notifications::client::GithubClient;
use mcp_github_notifications::config::{Config, DEFAULT_API_URL};
use mcp_github_notifications::server;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

/// MCP server for GitHub notifications: list, read, and manage subscriptions
#[derive(Parser)]
#[command(name = "mcp-github-notifications", version, about)]
struct Cli {
    /// GitHub personal access token.
    /// Can also be set via GITHUB_TOKEN environment variable.
    #[arg(long)]
    token: Option<String>,

    /// Read GitHub token from an environment variable.
    /// Default: GITHUB_TOKEN
    #[arg(long = "token-env")]
    token_env: Option<String>,

    /// Base URL of the GitHub REST API (GitHub Enterprise: https://HOST/api/v3)
    #[arg(long = "api-url", default_value = DEFAULT_API_URL)]
    api_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::resolve(cli.token, cli.token_env.as_deref(), &cli.api_url)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if !config.is_authenticated() {
        tracing::warn!("No GitHub token provided; every request will fail with 401");
    }

    tracing::info!(
        authenticated = config.is_authenticated(),
        api_url = %config.api_url(),
        "Starting mcp-github-notifications server"
    );

    let github = GithubClient::new(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create GitHub client: {}", e))?;

    let service = server::McpNotificationsServer::new(github);
    let running = service.serve(stdio()).await?;
    running.waiting().await?;

    Ok(())
}
