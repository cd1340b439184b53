//! Integration tests for the CLI commands over a JSONL corpus.

use std::io::Write;
use std::path::PathBuf;

use tempfile::{NamedTempFile, TempDir};

use braid::cli::args::{HealthArgs, SearchArgs};
use braid::cli::commands::{run_health, run_search};
use braid::hybrid::config::FusionAlgorithm;
use braid::hybrid::search::searcher::{SearchSource, SearchStrategy};

const CORPUS: &str = r#"{"id":"hours","tenantId":"bistro","content":"We are open from noon until ten every evening","metadata":{"lang":"en"}}
{"id":"menu","tenantId":"bistro","content":"Our menu features wood fired pizza and fresh pasta","metadata":{"lang":"en"}}
{"id":"horario","tenantId":"bistro","content":"Abrimos todos los dias al mediodia","metadata":{"lang":"es"}}

{"id":"bread","tenantId":"bakery","content":"Fresh sourdough bread every morning"}
"#;

fn corpus_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CORPUS.as_bytes()).unwrap();
    file
}

fn search_args(corpus: PathBuf, query: &str, tenant: &str) -> SearchArgs {
    SearchArgs {
        corpus,
        query: query.to_string(),
        tenant: tenant.to_string(),
        strategy: SearchStrategy::Auto,
        algorithm: None,
        limit: None,
        filters: Vec::new(),
        sequential: false,
        no_metadata: false,
        config: None,
    }
}

#[tokio::test]
async fn test_search_command() {
    let corpus = corpus_file();
    let mut args = search_args(corpus.path().to_path_buf(), "fresh pizza", "bistro");
    args.algorithm = Some(FusionAlgorithm::Weighted);
    args.limit = Some(2);

    let response = run_search(&args).await.unwrap();
    assert_eq!(response.best_result().unwrap().id, "menu");
    assert!(response.len() <= 2);
    assert!(response.ids().iter().all(|id| *id != "bread"));
}

#[tokio::test]
async fn test_search_command_with_filter_and_strategy() {
    let corpus = corpus_file();
    let mut args = search_args(corpus.path().to_path_buf(), "abrimos open", "bistro");
    args.strategy = SearchStrategy::Keyword;
    args.filters = vec!["lang=es".to_string()];
    args.sequential = true;
    args.no_metadata = true;

    let response = run_search(&args).await.unwrap();
    assert_eq!(response.ids(), vec!["horario"]);
    assert_eq!(response.results[0].sources, vec![SearchSource::Keyword]);
    assert!(response.results[0].metadata.is_empty());
    assert_eq!(response.metadata.vector_results, 0);
}

#[tokio::test]
async fn test_search_command_reads_config_file() {
    let corpus = corpus_file();
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, r#"{"fusionAlgorithm":"adaptive","finalResultLimit":1}"#).unwrap();

    let mut args = search_args(corpus.path().to_path_buf(), "fresh pizza", "bistro");
    args.config = Some(config_path);

    let response = run_search(&args).await.unwrap();
    assert_eq!(response.len(), 1);
}

#[tokio::test]
async fn test_search_command_rejects_bad_input() {
    let corpus = corpus_file();

    let args = search_args(corpus.path().to_path_buf(), "   ", "bistro");
    assert!(run_search(&args).await.unwrap_err().is_validation());

    let mut args = search_args(corpus.path().to_path_buf(), "pizza", "bistro");
    args.filters = vec!["no-equals-sign".to_string()];
    assert!(run_search(&args).await.unwrap_err().is_validation());

    let args = search_args(PathBuf::from("/nonexistent/corpus.jsonl"), "pizza", "bistro");
    assert!(run_search(&args).await.is_err());
}

#[tokio::test]
async fn test_bad_config_file_is_rejected() {
    let corpus = corpus_file();
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, r#"{"vectorWeight":3.0}"#).unwrap();

    let mut args = search_args(corpus.path().to_path_buf(), "pizza", "bistro");
    args.config = Some(config_path);
    assert!(run_search(&args).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_health_command() {
    let corpus = corpus_file();
    let report = run_health(&HealthArgs {
        corpus: corpus.path().to_path_buf(),
        config: None,
    })
    .await
    .unwrap();

    assert!(report.healthy);
    assert_eq!(report.documents, 4);
    assert_eq!(report.stats.total_searches, 1);
}
