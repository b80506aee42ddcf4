//! `resolve`, `map`, `routes` and `find`: one-shot engine calls.

use super::RequestArgs;
use anyhow::{Context, Result};
use waymark::config::WaymarkConfig;
use waymark::mapping::RewriteEntry;
use waymark::resolver::{ResolutionEngine, ResolverFactory};
use waymark::{debug, log};

fn engine(config: &WaymarkConfig) -> Result<ResolutionEngine> {
    let factory = ResolverFactory::from_config(config).context("building the rewrite table")?;
    Ok(factory.resolver()?)
}

pub fn resolve(config: &WaymarkConfig, path: &str, args: &RequestArgs) -> Result<()> {
    let request = args.to_request(None);
    let engine = engine(config)?;
    let resource = engine
        .resolve(Some(path), request.as_ref())
        .with_context(|| format!("resolving '{path}'"))?;

    log!("resolve"; "{}", resource);
    log!(
        "resolve";
        "resolution path `{}`, info `{}`",
        resource.metadata.resolution_path,
        resource.metadata.resolution_path_info
    );
    if !resource.exists() {
        log!("warning"; "no resource found at '{}'", path);
    }
    Ok(())
}

pub fn map(
    config: &WaymarkConfig,
    path: &str,
    args: &RequestArgs,
    context_path: Option<&str>,
) -> Result<()> {
    let request = args.to_request(context_path);
    let engine = engine(config)?;
    let url = engine
        .map(path, request.as_ref())
        .with_context(|| format!("mapping '{path}'"))?;

    log!("map"; "{}", url);
    Ok(())
}

pub fn routes(config: &WaymarkConfig) -> Result<()> {
    let factory = ResolverFactory::from_config(config).context("building the rewrite table")?;
    let table = factory.table();

    log!("routes"; "resolve ({} entries)", table.resolve_entries().len());
    for entry in table.resolve_entries() {
        log!("routes"; "  {}", describe_entry(entry));
    }
    log!("routes"; "map ({} entries)", table.map_entries().len());
    for entry in table.map_entries() {
        log!("routes"; "  {}", describe_entry(entry));
    }
    Ok(())
}

pub fn find(config: &WaymarkConfig, query: &str, language: &str) -> Result<()> {
    let engine = engine(config)?;
    let found = engine.find_resources(query, language)?;

    debug!("find"; "`{}` in {} matched {}", query, language, found.len());
    if found.is_empty() {
        log!("find"; "no resources matched");
    }
    for resource in &found {
        log!("find"; "{}", resource);
    }
    Ok(())
}

/// `pattern -> a | b (302)` for one table row.
fn describe_entry(entry: &RewriteEntry) -> String {
    let targets = entry.replacements().join(" | ");
    match entry.status() {
        Some(status) => format!("{} -> {} ({})", entry.source(), targets, status),
        None => format!("{} -> {}", entry.source(), targets),
    }
}
