mod config;
mod error;
mod handler;
mod local;
mod packager;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mgw_musicgen::{GeneratorConfig, MelodyGenerator, ModelCache, RemoteLoader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::WorkerConfig;
use crate::handler::JobHandler;

#[derive(Debug, Parser)]
#[command(
    name = "mgw-worker",
    about = "Serverless MusicGen worker",
    version = env!("CARGO_PKG_VERSION")
)]
struct WorkerArgs {
    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Run a single job envelope from this file and exit
    #[arg(long)]
    test_input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = WorkerArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mgw_worker=info,mgw_musicgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = WorkerConfig::load()?.with_overrides(args.host, args.port);
    info!(
        "Using {} via {} (refresh_worker={})",
        config.model.id(),
        config.model_endpoint,
        config.refresh_worker
    );

    let loader = Arc::new(RemoteLoader::new(config.model_endpoint.clone()));
    let models = Arc::new(ModelCache::new(config.model.clone(), loader));
    let generator = MelodyGenerator::new(
        models,
        GeneratorConfig {
            output_dir: config.output_dir.clone(),
            ..GeneratorConfig::default()
        },
    );
    let handler = Arc::new(JobHandler::new(generator, config.refresh_worker));

    if let Some(path) = args.test_input.or_else(local::default_test_input) {
        let output = local::run_test_input(&handler, &path).await?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    server::serve(&config, handler).await
}
