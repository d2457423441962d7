//! kb-retriever - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use kb_retriever::{
    cli::{render_answer, render_hits, Args, Commands},
    completion::OllamaCompletion,
    config::Config,
    knowledge::{StaticConfigStore, TypedObjectReference},
    rag::{AnswerPipeline, HttpClientFactory, Retriever, RetrieverResolver},
    telemetry, CallContext,
};

const RETRIEVER_KIND: &str = "KnowledgeBaseRetriever";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(args.verbose, args.quiet);

    let config_file = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    debug!(config = %config_file.display(), "configuration loaded");

    match &args.command {
        Commands::Search {
            retriever,
            query,
            namespace,
        } => {
            let ctx = call_context(&config);
            let retriever = resolve(&args, &config, &config_file, &ctx, retriever, namespace).await?;
            let hits = retriever.search(&ctx, query).await?;
            print!("{}", render_hits(&hits));
        }
        Commands::Ask {
            retriever,
            question,
            namespace,
            json,
        } => {
            let ctx = call_context(&config);
            let retriever = resolve(&args, &config, &config_file, &ctx, retriever, namespace).await?;

            let http = reqwest::Client::builder()
                .timeout(config.retrieval.http_timeout())
                .build()?;
            let completion = OllamaCompletion::new(
                http,
                &config.completion.ollama_url,
                &config.completion.model,
                &config.completion.prompt_template,
            );
            let pipeline = AnswerPipeline::new(
                retriever,
                Arc::new(completion),
                config.retrieval.separator.clone(),
            );

            let answer = pipeline.answer(&ctx, question).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                print!("{}", render_answer(&answer));
            }
        }
        Commands::Config => {
            show_config(&config, &config_file)?;
        }
    }

    Ok(())
}

/// Call context bounded by the configured deadline and cancelled on Ctrl-C
fn call_context(config: &Config) -> CallContext {
    let ctx = CallContext::new().with_timeout(config.retrieval.deadline());
    let token = ctx.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            token.cancel();
        }
    });
    ctx
}

fn manifest_path(args: &Args, config: &Config, config_file: &Path) -> Result<PathBuf> {
    args.manifest
        .clone()
        .or_else(|| config.manifest_path(Some(config_file)))
        .context("no manifest configured: pass --manifest or set store.manifest")
}

async fn resolve(
    args: &Args,
    config: &Config,
    config_file: &Path,
    ctx: &CallContext,
    name: &str,
    namespace: &Option<String>,
) -> Result<Retriever> {
    let manifest = manifest_path(args, config, config_file)?;
    let store = StaticConfigStore::load(&manifest)
        .with_context(|| format!("failed to load manifest {}", manifest.display()))?;
    let factory = HttpClientFactory::new(config.retrieval.http_timeout())?;
    let resolver = RetrieverResolver::new(
        Arc::new(store),
        Arc::new(factory),
        config.store.app_namespace.clone(),
    );

    let mut node = TypedObjectReference::new(RETRIEVER_KIND, name);
    if let Some(ns) = namespace {
        node = node.in_namespace(ns);
    }

    Ok(resolver.resolve(ctx, &node).await?)
}

fn show_config(config: &Config, config_file: &Path) -> Result<()> {
    println!("{}", "kb-retriever Configuration".cyan().bold());
    println!("  File: {}", config_file.display());
    println!();

    println!("Store:");
    match config.manifest_path(Some(config_file)) {
        Some(path) => println!("  Manifest:       {}", path.display()),
        None => println!("  Manifest:       {}", "not set".yellow()),
    }
    println!("  App namespace:  {}", config.store.app_namespace);
    println!();

    println!("Retrieval:");
    println!("  Separator:      {:?}", config.retrieval.separator);
    println!("  HTTP timeout:   {}s", config.retrieval.http_timeout_secs);
    println!("  Deadline:       {}s", config.retrieval.deadline_secs);
    println!();

    println!("Completion:");
    println!("  Ollama:         {}", config.completion.ollama_url);
    println!("  Model:          {}", config.completion.model);
    println!();

    Ok(())
}
