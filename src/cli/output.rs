//! Output formatting for CLI commands.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::cli::args::{BraidArgs, OutputFormat};
use crate::error::Result;
use crate::hybrid::search::searcher::HybridSearchResponse;
use crate::hybrid::stats::HybridSearchStats;

/// Result structure for the health command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    pub documents: usize,
    pub duration_ms: f64,
    pub stats: HybridSearchStats,
}

/// Print a search response to stdout.
pub fn output_search(response: &HybridSearchResponse, args: &BraidArgs) -> Result<()> {
    let stdout = io::stdout();
    write_search(&mut stdout.lock(), response, args)
}

/// Print a health report to stdout.
pub fn output_health(report: &HealthReport, args: &BraidArgs) -> Result<()> {
    let stdout = io::stdout();
    write_health(&mut stdout.lock(), report, args)
}

/// Render a search response in the requested format.
pub fn write_search<W: Write>(
    out: &mut W,
    response: &HybridSearchResponse,
    args: &BraidArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Json => write_json(out, response, args.pretty),
        OutputFormat::Human => write_search_human(out, response, args),
    }
}

/// Render a health report in the requested format.
pub fn write_health<W: Write>(out: &mut W, report: &HealthReport, args: &BraidArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Json => write_json(out, report, args.pretty),
        OutputFormat::Human => {
            let status = if report.healthy { "healthy" } else { "unhealthy" };
            writeln!(out, "Status: {status}")?;
            writeln!(out, "Documents: {}", report.documents)?;
            writeln!(out, "Check time: {:.2}ms", report.duration_ms)?;
            Ok(())
        }
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(out, "{json}")?;
    Ok(())
}

fn format_score(score: Option<f32>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{s:.3}"))
}

fn write_search_human<W: Write>(
    out: &mut W,
    response: &HybridSearchResponse,
    args: &BraidArgs,
) -> Result<()> {
    writeln!(out, "Search Results:")?;
    writeln!(out, "═══════════════")?;

    for (i, result) in response.results.iter().enumerate() {
        writeln!(out)?;
        writeln!(
            out,
            "Result {}: {} (Score: {:.4})",
            i + 1,
            result.id,
            result.fusion_score
        )?;
        writeln!(out, "─────────────")?;
        writeln!(out, "{}", result.content)?;

        if args.verbosity() > 1 {
            let sources: Vec<&str> = result.sources.iter().map(|s| s.as_str()).collect();
            writeln!(
                out,
                "sources: {}  vector: {}  keyword: {}",
                sources.join("+"),
                format_score(result.vector_score),
                format_score(result.keyword_score)
            )?;

            let mut keys: Vec<&String> = result.metadata.keys().collect();
            keys.sort();
            for key in keys {
                writeln!(out, "{key}: {}", format_value(&result.metadata[key]))?;
            }
        }
    }

    let metadata = &response.metadata;
    writeln!(out)?;
    writeln!(out, "Total results: {}", metadata.total_results)?;
    writeln!(
        out,
        "Strategy: {} ({} vector, {} keyword, {} candidates)",
        metadata.search_strategy,
        metadata.vector_results,
        metadata.keyword_results,
        metadata.fused_results
    )?;
    writeln!(out, "Search time: {:.2}ms", metadata.processing_time_ms)?;

    if let Some(reason) = &metadata.degradation_reason {
        writeln!(out, "Warning: keyword search degraded: {reason}")?;
    }
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "null".to_string(),
    }
}
