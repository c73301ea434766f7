//! `regsync` application entry point.
//!
//! Uses `eyre` for opaque error handling at the application boundary,
//! converting domain-specific errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/regsync/config.toml` or path from `REGSYNC_CONFIG_PATH`)
//! 3. Environment variables (`REGSYNC_*`)
//! 4. Command-line arguments

use bollard::Docker;
use clap::Parser;
use eyre::{Report, Result as EyreResult};
use mockable::DefaultEnv;
use regsync::auth::DockerConfigCredentials;
use regsync::client::SyncClient;
use regsync::config::{AppConfig, Cli, Commands, load_config};
use regsync::engine::{EngineConnector, SocketResolver};
use regsync::error::{ContainerError, Result as RegsyncResult};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

type Client = SyncClient<Docker, DockerConfigCredentials>;

/// Application entry point.
///
/// Initialises logging, loads configuration, connects to the engine, and
/// dispatches to the subcommand handler.
fn main() -> EyreResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("regsync=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli).map_err(Report::from)?;

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        Report::from(ContainerError::RuntimeCreationFailed {
            message: e.to_string(),
        })
    })?;

    let client = build_client(runtime.handle(), &config).map_err(Report::from)?;
    run(runtime.handle(), &client, &cli.command).map_err(Report::from)
}

/// Connect to the engine and load registry credentials.
fn build_client(runtime: &Handle, config: &AppConfig) -> RegsyncResult<Client> {
    let env = DefaultEnv::new();
    let resolver = SocketResolver::new(&env);
    let docker = runtime.block_on(EngineConnector::connect_with_fallback_and_verify_async(
        config.engine_socket.as_deref(),
        config.api_version.as_deref(),
        &resolver,
    ))?;

    let credentials = match config
        .registry
        .docker_config
        .clone()
        .or_else(|| DockerConfigCredentials::default_path(&env))
    {
        Some(path) => DockerConfigCredentials::load(&path)?,
        None => DockerConfigCredentials::empty(),
    };
    tracing::debug!(hosts = credentials.hosts().count(), "loaded registry credentials");

    Ok(SyncClient::new(docker, credentials, config.retry.policy()))
}

/// Execute the CLI command, returning domain-specific errors.
///
/// Keeps semantic errors inside the run loop so the CLI boundary owns
/// conversion to `eyre::Report`.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn run(runtime: &Handle, client: &Client, command: &Commands) -> RegsyncResult<()> {
    match command {
        Commands::Pull(args) => client.pull(runtime, &args.reference),
        Commands::Push(args) => client.push(runtime, &args.reference),
        Commands::Tag(args) => client.tag(runtime, &args.source, &args.destination),
        Commands::Repush(args) => client.re_push(runtime, &args.source, &args.destination),
        Commands::Run(args) => {
            let container_id = client.run(
                runtime,
                &args.reference,
                args.name.as_deref(),
                &args.publish,
            )?;
            println!("{container_id}");
            Ok(())
        }
        Commands::Rm(args) => client.force_remove(runtime, &args.container),
        Commands::Images(args) => {
            for image in client.list_images_for_repo(runtime, &args.repository)? {
                let tags = if image.repo_tags.is_empty() {
                    String::from("<none>")
                } else {
                    image.repo_tags.join(", ")
                };
                println!("{}\t{tags}", image.id);
            }
            Ok(())
        }
    }
}
