//! lipages-inspect: fetch exactly one page of an endpoint and print it
//!
//! Usage:
//!   lipages-inspect organizationAcls --param q=roleAssignee --access-token "$TOKEN"
//!
//!   # Fixed offset into a collection, token taken from the configuration
//!   lipages-inspect posts --param q=author --param author=urn:li:organization:1 \
//!       --start 10 --count 4 --config data/config.json

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use lipages::client::Endpoint;
use lipages::{Config, LinkedInClient};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lipages-inspect")]
#[command(about = "Fetch a single raw page from an API endpoint", long_about = None)]
struct Args {
    /// Endpoint path relative to the API base, e.g. `organizationAcls`
    #[arg(value_name = "PATH")]
    path: String,

    /// Offset of the page
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Page size
    #[arg(long, default_value_t = 10)]
    count: usize,

    /// Query parameter as KEY=VALUE; repeatable
    #[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Bearer token
    #[arg(long)]
    access_token: Option<String>,

    /// Configuration file to take the token from when --access-token is absent
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let token = match (&args.access_token, &args.config) {
        (Some(token), _) => token.clone(),
        (None, Some(path)) => Config::from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
            .access_token()?
            .to_string(),
        (None, None) => bail!("either --access-token or --config is required"),
    };

    let mut endpoint = Endpoint::new(args.path);
    for param in &args.params {
        let (key, value) = param
            .split_once('=')
            .ok_or_else(|| anyhow!("parameter '{param}' is not in KEY=VALUE form"))?;
        endpoint = endpoint.param(key, value);
    }

    let client = LinkedInClient::new(token);
    let page = client.fetch_page(&endpoint, args.start, args.count)?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}
