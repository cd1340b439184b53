//! Command implementations for Braid CLI.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use serde_json::Value;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::{BraidError, Result};
use crate::hybrid::config::{ConfigUpdate, HybridQueryConfig};
use crate::hybrid::engine::HybridSearchService;
use crate::hybrid::memory::{HashingEmbedder, MemoryKeywordIndex, MemoryVectorIndex, load_corpus};
use crate::hybrid::search::searcher::{HybridSearchRequest, HybridSearchResponse};

/// Execute a CLI command.
pub fn execute_command(args: BraidArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match &args.command {
        Command::Search(search_args) => {
            let response = runtime.block_on(run_search(search_args))?;
            output_search(&response, &args)
        }
        Command::Health(health_args) => {
            let report = runtime.block_on(run_health(health_args))?;
            output_health(&report, &args)?;
            if report.healthy {
                Ok(())
            } else {
                Err(BraidError::backend("health check failed"))
            }
        }
    }
}

/// Load a configuration file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<HybridQueryConfig> {
    match path {
        Some(path) => {
            debug!("loading config from {}", path.display());
            HybridQueryConfig::from_json_str(&fs::read_to_string(path)?)
        }
        None => Ok(HybridQueryConfig::default()),
    }
}

/// Build a service over in-memory indexes loaded from a JSONL corpus.
///
/// Returns the service and the number of documents indexed.
pub fn build_service(corpus: &Path, config: HybridQueryConfig) -> Result<(HybridSearchService, usize)> {
    let documents = load_corpus(corpus)?;
    let count = documents.len();

    let vector = Arc::new(MemoryVectorIndex::new(Arc::new(HashingEmbedder::default())));
    let keyword = Arc::new(MemoryKeywordIndex::new());
    vector.add_all(documents.iter().cloned());
    keyword.add_all(documents);

    info!("indexed {count} documents from {}", corpus.display());
    Ok((HybridSearchService::new(config, vector, keyword)?, count))
}

/// Parse a `KEY=VALUE` filter. Values that parse as JSON keep their type.
pub fn parse_filter(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| BraidError::validation(format!("filter '{raw}' must be KEY=VALUE")))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(BraidError::validation(format!("filter '{raw}' has an empty key")));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Run the search command.
pub async fn run_search(args: &SearchArgs) -> Result<HybridSearchResponse> {
    let mut config = load_config(args.config.as_deref())?;

    let mut update = ConfigUpdate::new();
    if let Some(algorithm) = args.algorithm {
        update = update.fusion_algorithm(algorithm);
    }
    if args.sequential {
        update = update.parallel_search(false);
    }
    config = config.merged(&update)?;

    let mut request = HybridSearchRequest::new(args.query.clone(), args.tenant.clone())
        .with_strategy(args.strategy)
        .with_metadata(!args.no_metadata);
    if let Some(limit) = args.limit {
        request = request.with_limit(limit);
    }
    for raw in &args.filters {
        let (key, value) = parse_filter(raw)?;
        request = request.with_filter(key, value);
    }
    request.validate()?;

    let (service, _) = build_service(&args.corpus, config)?;
    service.search(&request).await
}

/// Run the health command.
pub async fn run_health(args: &HealthArgs) -> Result<HealthReport> {
    let config = load_config(args.config.as_deref())?;
    let (service, documents) = build_service(&args.corpus, config)?;

    let start = Instant::now();
    let healthy = service.health_check().await;

    Ok(HealthReport {
        healthy,
        documents,
        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        stats: service.stats(),
    })
}
