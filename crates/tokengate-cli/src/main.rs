//! tokengate CLI - send one request through the bearer-token middleware
//!
//! Loads an optional resource-server configuration, seeds an in-memory token
//! store and prints the response. `--token-delay-ms` publishes the token after
//! the request has started, which shows the wait-for-token path.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Method;
use tracing::{debug, info};

use tokengate_client::{RequestAuthorizer, build_client};
use tokengate_common::{AuthorizerConfig, ModuleConfig, SharedTokenStore};

use crate::error_handler::LoggingErrorHandler;

mod error_handler;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL to request
    url: String,

    /// HTTP method
    #[arg(long, default_value = "GET")]
    method: String,

    /// Path to a TOML file with a `[resource_server]` table
    #[arg(long)]
    config: Option<PathBuf>,

    /// Access token to publish (or set TOKENGATE_ACCESS_TOKEN env var)
    #[arg(long, env = "TOKENGATE_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Publish the token this many milliseconds after the request starts
    #[arg(long)]
    token_delay_ms: Option<u64>,

    /// How long a request waits for a token, in milliseconds
    #[arg(long, default_value_t = 1000)]
    wait_ms: u64,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_seconds: Option<u64>,
}

/// Log directives used when `RUST_LOG` is unset. Covers the binary and both library crates.
const DEFAULT_LOG_FILTER: &str = "tokengate=info,tokengate_client=info,tokengate_common=info";

/// Initializes structured logging with tracing.
///
/// Supports two output formats via `TOKENGATE_LOG_FORMAT` environment variable:
/// - `json`: Machine-readable JSON logs
/// - `pretty`: Human-readable formatted logs (default)
///
/// Log level is controlled via `RUST_LOG` environment variable.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let format = std::env::var("TOKENGATE_LOG_FORMAT")
        .unwrap_or_else(|_| "pretty".to_string())
        .to_lowercase();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AuthorizerConfig> {
    let Some(path) = path else {
        return Ok(AuthorizerConfig::NoConfig);
    };

    let config = ModuleConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    Ok(config.into())
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {method}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let method = parse_method(&args.method)?;
    let config = load_config(args.config.as_ref())?;
    debug!(?config, "Loaded authorizer configuration");

    let tokens = SharedTokenStore::new();
    let authorizer = RequestAuthorizer::new(config, Arc::new(tokens.clone()))
        .with_error_handler(Arc::new(LoggingErrorHandler))
        .with_token_wait(Duration::from_millis(args.wait_ms));
    let client = build_client(authorizer, args.timeout_seconds.map(Duration::from_secs))?;

    if let Some(token) = args.token {
        match args.token_delay_ms {
            Some(delay_ms) => {
                let publisher = tokens.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    info!(delay_ms, "Publishing access token");
                    publisher.set_access_token(token);
                });
            }
            None => tokens.set_access_token(token),
        }
    }

    let response = client
        .request(method, &args.url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", args.url))?;

    let status = response.status();
    let body = response.text().await.context("Failed to read response body")?;

    println!("{status}");
    if !body.is_empty() {
        println!("{body}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_parse_args_defaults() {
        let args = Args::try_parse_from(["tokengate", "https://api.example.com/"]).unwrap();

        assert_eq!(args.url, "https://api.example.com/");
        assert_eq!(args.method, "GET");
        assert_eq!(args.wait_ms, 1000);
        assert!(args.config.is_none());
        assert!(args.token_delay_ms.is_none());
    }

    #[test]
    fn test_parse_args_with_delay() {
        let args = Args::try_parse_from([
            "tokengate",
            "--token",
            "abc",
            "--token-delay-ms",
            "400",
            "--wait-ms",
            "2000",
            "https://api.example.com/",
        ])
        .unwrap();

        assert_eq!(args.token.as_deref(), Some("abc"));
        assert_eq!(args.token_delay_ms, Some(400));
        assert_eq!(args.wait_ms, 2000);
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("post").unwrap(), Method::POST);
        assert!(parse_method("not a method").is_err());
    }

    #[test]
    fn test_default_log_filter_covers_workspace_crates() {
        let directives: Vec<&str> = DEFAULT_LOG_FILTER.split(',').collect();
        for target in ["tokengate", "tokengate_client", "tokengate_common"] {
            assert!(
                directives.contains(&format!("{target}=info").as_str()),
                "missing default directive for {target}"
            );
        }
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_load_config_without_path() {
        assert_eq!(load_config(None).unwrap(), AuthorizerConfig::NoConfig);
    }
}
