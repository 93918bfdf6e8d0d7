use std::env;
use std::sync::Arc;

use anyhow::Result;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use docsearch_core::config::{expand_path, Config, SearchConfig};
use docsearch_hybrid::SearchService;

fn usage(program: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {program} build-archive [dump.jsonl]");
    eprintln!("  {program} build-files <directory>");
    eprintln!("  {program} query <text> [top_k] [keyword|semantic|hybrid] [all|archive|files]");
    eprintln!("  {program} status");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
    }

    let config = Config::load()?;
    let search_config = SearchConfig::from_config(&config);
    let embedder = docsearch_embed::default_embedder()?;
    let service = SearchService::new(search_config.clone(), embedder);

    match args[1].as_str() {
        "build-archive" => {
            let source = args.get(2).map(expand_path);
            service.build_archive(source).await?;
            println!("{}", service.status().await);
        }
        "build-files" => {
            let Some(dir) = args.get(2).map(expand_path) else {
                usage(&args[0]);
            };
            service.build_files(dir).await?;
            println!("{}", service.status().await);
        }
        "query" => {
            let Some(query) = args.get(2) else {
                usage(&args[0]);
            };
            let top_k = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(3);
            let strategy = args.get(4).map(String::as_str).unwrap_or("hybrid");
            let source = args.get(5).map(String::as_str).unwrap_or("all");

            load_corpora(&service, &search_config).await;
            println!("{}", service.search(query, top_k, strategy, source).await?);
        }
        "status" => {
            load_corpora(&service, &search_config).await;
            println!("{}", service.status().await);
        }
        _ => usage(&args[0]),
    }
    Ok(())
}

/// Bring up whatever corpora this machine has: the archive from its
/// persisted index, the files corpus from the configured directory.
/// Either may be absent; queries then get the corresponding note.
async fn load_corpora(service: &Arc<SearchService>, config: &SearchConfig) {
    if let Err(e) = service.build_archive(None).await {
        warn!(error = %e, "archive corpus not loaded");
    }
    if let Some(dir) = &config.files_dir {
        if let Err(e) = service.build_files(expand_path(dir)).await {
            warn!(error = %e, "files corpus not loaded");
        }
    }
}
