//! resolve command: Resolve navigation links to @iot.ids
//!
//! Links come from --url, stdin, or a text file. Results go to stdout,
//! progress and diagnostics to stderr.

use crate::config::{ResolverConfig, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT};
use crate::extract::extract_urls;
use crate::resolver::LinkResolver;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::io::{self, BufRead};
use tokio::fs;

#[derive(Args)]
pub struct ResolveArgs {
    /// Text or markdown file to extract navigation links from
    #[arg(value_name = "FILE")]
    file: Option<String>,

    /// Resolve this link (repeatable)
    #[arg(long)]
    url: Vec<String>,

    /// Read links from stdin (one per line)
    #[arg(long)]
    stdin: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Links resolved at the same time (1-32)
    #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u8).range(1..=32))]
    parallel: u8,

    /// Request timeout in milliseconds (0 waits indefinitely)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, env = "FROST_LINK_TIMEOUT_MS")]
    timeout: u64,

    /// User-Agent header sent to the server
    #[arg(long, default_value = DEFAULT_USER_AGENT, env = "FROST_LINK_USER_AGENT")]
    user_agent: String,

    /// Require a response shape and report mismatches as errors
    #[arg(long, value_enum)]
    strict: Option<Strictness>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    /// One line of comma-joined ids per link
    Text,
}

/// Response shape a link is required to have
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strictness {
    /// Single entity with @iot.id
    Single,
    /// Entity collection under value
    Multiple,
}

/// Result for a single link (compact)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveResult {
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full report (compact)
#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub ok: usize,
    pub failed: usize,
    pub results: Vec<ResolveResult>,
}

/// Run the resolve command
pub async fn run_resolve(args: ResolveArgs) -> Result<()> {
    let links = get_links(&args).await?;

    if links.is_empty() {
        eprintln!("No links found.");
        std::process::exit(1);
    }

    let config = ResolverConfig::from_timeout_ms(args.timeout).with_user_agent(&args.user_agent);
    let resolver = LinkResolver::new(&config).context("Failed to build HTTP client")?;

    eprintln!(
        "Resolving {} link{} ({} parallel)...",
        links.len(),
        if links.len() == 1 { "" } else { "s" },
        args.parallel
    );

    let report = resolve_links(&resolver, &links, args.strict, args.parallel as usize).await;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => {
            for result in &report.results {
                println!("{}", result.ids.as_deref().unwrap_or_default());
            }
        }
    }

    eprintln!("Done: {}/{} resolved", report.ok, report.ok + report.failed);

    Ok(())
}

/// Get links from --url, stdin, or file
async fn get_links(args: &ResolveArgs) -> Result<Vec<String>> {
    if !args.url.is_empty() {
        return Ok(args.url.clone());
    }

    if args.stdin {
        let stdin = io::stdin();
        let links: Vec<String> = stdin
            .lock()
            .lines()
            .map_while(Result::ok)
            .map(|line| line.trim().to_string())
            .filter(|line| line.starts_with("http"))
            .collect();
        return Ok(links);
    }

    if let Some(file) = &args.file {
        let content = fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read file: {}", file))?;
        return Ok(extract_urls(&content));
    }

    eprintln!("Usage:");
    eprintln!("  frost-link resolve <file>        Resolve links found in file");
    eprintln!("  frost-link resolve --url <LINK>  Resolve a single link");
    eprintln!("  frost-link resolve --stdin       Read links from stdin");
    std::process::exit(1);
}

/// Resolve links with at most `parallel` requests in flight.
///
/// Results keep the order of `links`.
pub async fn resolve_links(
    resolver: &LinkResolver,
    links: &[String],
    strictness: Option<Strictness>,
    parallel: usize,
) -> ResolveReport {
    let results: Vec<ResolveResult> = stream::iter(links)
        .map(|link| resolve_one(resolver, link, strictness))
        .buffered(parallel.max(1))
        .collect()
        .await;

    let ok = results.iter().filter(|r| r.ids.is_some()).count();

    ResolveReport {
        ok,
        failed: results.len() - ok,
        results,
    }
}

#[allow(deprecated)]
async fn resolve_one(
    resolver: &LinkResolver,
    link: &str,
    strictness: Option<Strictness>,
) -> ResolveResult {
    let outcome = match strictness {
        None => Ok(resolver.resolve_iot_ids(Some(link)).await),
        Some(Strictness::Single) => resolver.single_iot_id(Some(link)).await,
        Some(Strictness::Multiple) => resolver.multiple_iot_ids(Some(link)).await,
    };

    match outcome {
        Ok(ids) => ResolveResult {
            link: link.to_string(),
            ids,
            error: None,
        },
        Err(e) => ResolveResult {
            link: link.to_string(),
            ids: None,
            error: Some(e.to_string()),
        },
    }
}
