//! sca - source-code analysis task runner
//!
//! - `run`: executor と 3 つのメンテナンススイープを起動（Ctrl-C で停止）
//! - `sample`: コミット履歴から年ごとの代表コミットを選ぶ
//! - `build`: ビルドターゲットを 1 回実行してエンベロープを表示

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

use sca_core::app::{AppBuilder, DEFAULT_TASK_TYPES, Services, TaskCommands};
use sca_core::config::ScaConfig;
use sca_core::domain::{GitCommit, NewTask, Repository, sample_yearly_commits};
use sca_core::impls::{EarthlyRunner, InMemoryStore};
use sca_core::ports::{BuildRequest, BuildRunner, SystemClock, UlidGenerator};

#[derive(Parser)]
#[command(name = "sca")]
#[command(about = "Runs repository analysis tasks through containerized builds", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the task executor and maintenance sweeps
    Run {
        /// JSON file with `repositories` and `tasks` to load into the store
        #[arg(long)]
        seed: Option<PathBuf>,
    },
    /// Print one commit per calendar year from a JSON history
    Sample {
        /// JSON array of commits, newest first
        #[arg(long)]
        history: PathBuf,
        /// Overrides `sampling.max_years`
        #[arg(long)]
        max_years: Option<usize>,
    },
    /// Run a single build target and print the result envelope
    Build {
        #[arg(long)]
        target: String,
        /// Build argument, KEY=VALUE
        #[arg(long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,
        /// Build secret, KEY=VALUE
        #[arg(long = "secret", value_parser = parse_key_value)]
        secrets: Vec<(String, String)>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct Seed {
    #[serde(default)]
    repositories: Vec<Repository>,
    #[serde(default)]
    tasks: Vec<NewTask>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

async fn load_seed(store: &InMemoryStore, tasks: &TaskCommands, seed: Seed) -> Result<()> {
    let (repo_count, task_count) = (seed.repositories.len(), seed.tasks.len());
    for repository in seed.repositories {
        store.put_repository(repository).await;
    }
    for task in seed.tasks {
        tasks
            .create_task(task)
            .await
            .context("invalid seed task")?;
    }
    info!(repositories = repo_count, tasks = task_count, "seed loaded");
    Ok(())
}

async fn run(config: ScaConfig, seed: Option<PathBuf>) -> Result<()> {
    let clock = Arc::new(SystemClock);
    let store = Arc::new(InMemoryStore::new(Arc::new(UlidGenerator::new(clock.clone()))));
    let runner = Arc::new(EarthlyRunner::from_config(&config.earthly));
    let app = AppBuilder::new(Services::in_memory(store.clone(), runner, clock), config)
        .with_default_handlers()?
        .expect_tasks(&DEFAULT_TASK_TYPES)
        .build()?;

    if let Some(path) = seed {
        load_seed(&store, app.task_commands(), read_json(&path)?).await?;
    }

    let running = app.start();
    info!(jobs = ?running.job_names(), "started");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");
    running.shutdown_and_join().await;
    Ok(())
}

fn sample(config: &ScaConfig, history: &Path, max_years: Option<usize>) -> Result<()> {
    let commits: Vec<GitCommit> = read_json(history)?;
    let sampled = sample_yearly_commits(&commits, max_years.unwrap_or(config.sampling.max_years));
    println!("{}", serde_json::to_string_pretty(&sampled)?);
    Ok(())
}

async fn build(
    config: &ScaConfig,
    target: String,
    args: Vec<(String, String)>,
    secrets: Vec<(String, String)>,
) -> Result<()> {
    let mut request = BuildRequest::new(target);
    request.args.extend(args);
    request.secrets.extend(secrets);

    let result = EarthlyRunner::from_config(&config.earthly)
        .run(&request)
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        bail!("build target {} failed", request.target);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG (e.g. RUST_LOG=sca_core=debug); defaults to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ScaConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { seed } => run(config, seed).await,
        Commands::Sample { history, max_years } => sample(&config, &history, max_years),
        Commands::Build {
            target,
            args,
            secrets,
        } => build(&config, target, args, secrets).await,
    }
}
