//! Workflow router operator CLI
//!
//! Routes requests from the terminal and maintains the workflow store
//! (seeding from JSON files, model migrations). Uses the SQLite store driver
//! with the configured store endpoint as the database URL.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use workflow_router::store::SearchField;
use workflow_router::{
    DynamicWorkflowRouter, RequestContext, ResponseMode, RouterConfig, SqliteWorkflowStore,
    WorkflowDefinition,
};

#[derive(Parser)]
#[command(name = "workflow-router", version, about = "Route requests to stored workflows")]
struct Cli {
    /// YAML configuration file; the environment is used when omitted
    #[arg(long, global = true, env = "WORKFLOW_ROUTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a request and execute the selected workflow
    Route {
        text: String,
        /// Extra context as key=value, repeatable
        #[arg(long = "context", value_parser = parse_key_value)]
        context: Vec<(String, String)>,
        /// Print the whole reply at once
        #[arg(long)]
        no_stream: bool,
    },
    /// Execute a workflow by id
    Run {
        workflow_id: String,
        text: String,
        #[arg(long = "context", value_parser = parse_key_value)]
        context: Vec<(String, String)>,
        #[arg(long)]
        no_stream: bool,
    },
    /// Print the workflow id the orchestrator picks
    Classify { text: String },
    /// List workflows
    List {
        #[arg(long)]
        category: Option<String>,
        /// Include disabled workflows
        #[arg(long)]
        all: bool,
    },
    /// Search enabled workflows by keywords
    Search {
        #[arg(required = true)]
        keywords: Vec<String>,
        /// Field to search (id, name, description, category, tags), repeatable
        #[arg(long = "field", value_parser = parse_search_field)]
        fields: Vec<SearchField>,
    },
    /// Upsert every *.json workflow definition in a directory
    Seed { dir: PathBuf },
    /// Switch every workflow using one model to another
    MigrateModel {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
}

fn parse_search_field(raw: &str) -> std::result::Result<SearchField, String> {
    SearchField::parse(raw).ok_or_else(|| format!("unknown search field '{}'", raw))
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(rust_log)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RouterConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => RouterConfig::from_env(),
    };

    let router = DynamicWorkflowRouter::new(config, Arc::new(SqliteWorkflowStore::new()));
    let result = run(&router, cli.command).await;
    router.cleanup().await;
    result
}

async fn run(router: &DynamicWorkflowRouter, command: Command) -> Result<()> {
    match command {
        Command::Route {
            text,
            context,
            no_stream,
        } => {
            let stream = router
                .route_and_execute(&text, to_context(context), mode(no_stream))
                .await?;
            print_stream(stream).await
        }
        Command::Run {
            workflow_id,
            text,
            context,
            no_stream,
        } => {
            let stream = router
                .execute_workflow(&workflow_id, &text, to_context(context), mode(no_stream))
                .await?;
            print_stream(stream).await
        }
        Command::Classify { text } => {
            println!("{}", router.classify_intent(&text, None).await?);
            Ok(())
        }
        Command::List { category, all } => {
            let workflows = router
                .registry()
                .list_workflows(category.as_deref(), !all)
                .await?;
            for wf in workflows {
                let state = if wf.is_enabled() { "" } else { " (disabled)" };
                println!("{}{}: {}", wf.id, state, wf.description);
            }
            Ok(())
        }
        Command::Search { keywords, fields } => {
            let fields = if fields.is_empty() {
                SearchField::DEFAULT.to_vec()
            } else {
                fields
            };
            for wf in router
                .registry()
                .search_workflows_in(&keywords[..], &fields)
                .await?
            {
                println!("{}: {}", wf.id, wf.description);
            }
            Ok(())
        }
        Command::Seed { dir } => seed(router, &dir).await,
        Command::MigrateModel { from, to } => {
            let migrated = router.registry().migrate_model(&from, &to).await?;
            println!("Migrated {} workflow(s) from {} to {}", migrated, from, to);
            Ok(())
        }
    }
}

fn mode(no_stream: bool) -> ResponseMode {
    if no_stream {
        ResponseMode::Single
    } else {
        ResponseMode::Stream
    }
}

fn to_context(pairs: Vec<(String, String)>) -> Option<RequestContext> {
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.into_iter().collect())
    }
}

async fn print_stream(mut stream: workflow_router::ResponseStream) -> Result<()> {
    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        write!(stdout, "{}", chunk)?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}

async fn seed(router: &DynamicWorkflowRouter, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    paths.sort();

    let mut loaded = 0;
    for path in &paths {
        let workflow = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| {
                serde_json::from_str::<WorkflowDefinition>(&raw).map_err(anyhow::Error::from)
            });

        match workflow {
            Ok(workflow) => {
                let id = workflow.id.clone();
                router.registry().upsert_workflow(workflow).await?;
                println!("Loaded: {}", id);
                loaded += 1;
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping workflow file"),
        }
    }

    println!("Seeded {} of {} workflow file(s)", loaded, paths.len());
    Ok(())
}
