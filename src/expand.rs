//! expand command: Resolve every navigation link of an entity document
//!
//! Reads a FROST entity (or entity collection) as JSON and replaces each
//! `<Relation>@iot.navigationLink` with the ids it points at.

use crate::config::{ResolverConfig, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT};
use crate::envelope::{identifier_text, IOT_ID};
use crate::extract::{entities, is_collection, navigation_fields};
use crate::resolver::LinkResolver;
use anyhow::{bail, Context, Result};
use clap::Args;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::io::AsyncReadExt;

#[derive(Args)]
pub struct ExpandArgs {
    /// Entity JSON file (reads stdin when omitted)
    #[arg(value_name = "FILE")]
    file: Option<String>,

    /// Links resolved at the same time (1-32)
    #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u8).range(1..=32))]
    parallel: u8,

    /// Request timeout in milliseconds (0 waits indefinitely)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, env = "FROST_LINK_TIMEOUT_MS")]
    timeout: u64,

    /// User-Agent header sent to the server
    #[arg(long, default_value = DEFAULT_USER_AGENT, env = "FROST_LINK_USER_AGENT")]
    user_agent: String,
}

/// One entity with its relations resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedEntity {
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Relation name to comma-joined ids, `null` when unresolved
    pub relations: BTreeMap<String, Option<String>>,
}

pub async fn run_expand(args: ExpandArgs) -> Result<()> {
    let content = match &args.file {
        Some(file) => tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read file: {}", file))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        }
    };

    let document: Value =
        serde_json::from_str(&content).context("Failed to parse entity document as JSON")?;
    if !document.is_object() {
        bail!("Entity document must be a JSON object");
    }

    let config = ResolverConfig::from_timeout_ms(args.timeout).with_user_agent(&args.user_agent);
    let resolver = LinkResolver::new(&config).context("Failed to build HTTP client")?;

    let expanded = expand_document(&resolver, &document, args.parallel as usize).await;
    let resolved: usize = expanded
        .iter()
        .map(|e| e.relations.values().filter(|ids| ids.is_some()).count())
        .sum();
    let total: usize = expanded.iter().map(|e| e.relations.len()).sum();

    let output = if is_collection(&document) {
        serde_json::to_string(&expanded)?
    } else {
        match expanded.first() {
            Some(entity) => serde_json::to_string(entity)?,
            None => "{}".to_string(),
        }
    };
    println!("{}", output);

    eprintln!("Done: {}/{} links resolved", resolved, total);

    Ok(())
}

/// Resolve the navigation links of every entity in `document`
pub async fn expand_document(
    resolver: &LinkResolver,
    document: &Value,
    parallel: usize,
) -> Vec<ExpandedEntity> {
    let mut expanded = Vec::new();

    for entity in entities(document) {
        let fields = navigation_fields(entity);
        let resolved: Vec<(String, Option<String>)> = stream::iter(fields)
            .map(|field| async move {
                let ids = resolver.resolve_iot_ids(field.link.as_deref()).await;
                (field.relation, ids)
            })
            .buffered(parallel.max(1))
            .collect()
            .await;

        expanded.push(ExpandedEntity {
            id: entity.get(IOT_ID).filter(|id| !id.is_null()).map(identifier_text),
            relations: resolved.into_iter().collect(),
        });
    }

    expanded
}
