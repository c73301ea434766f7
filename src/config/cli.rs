//! Command-line argument definitions for regsync.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for regsync.
#[derive(Debug, Parser)]
#[command(name = "regsync")]
#[command(
    author,
    version,
    about = "Synchronise container images between a local engine and registries"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Container engine socket path or URL.
    #[arg(long, global = true)]
    pub engine_socket: Option<String>,

    /// Engine API version, for example `1.43`.
    #[arg(long, global = true)]
    pub api_version: Option<String>,

    /// Extra pull attempts after a failure.
    #[arg(long, global = true)]
    pub retry_pulls: Option<u32>,

    /// Seconds to wait before the first pull retry.
    #[arg(long, global = true)]
    pub retry_delay_secs: Option<u64>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pull an image, retrying on failure.
    Pull(ImageArgs),

    /// Push a local image to its registry.
    Push(ImageArgs),

    /// Give a local image an additional reference.
    Tag(TransferArgs),

    /// Pull an image, tag it for another registry, and push it there.
    Repush(TransferArgs),

    /// Pull an image and start a container from it.
    Run(RunArgs),

    /// Force-remove a container.
    Rm(RemoveArgs),

    /// List local images of a repository.
    Images(ImagesArgs),
}

/// Arguments naming a single image reference.
#[derive(Debug, Parser)]
pub struct ImageArgs {
    /// Image reference, for example `ghcr.io/org/app:1.0`.
    #[arg(required = true)]
    pub reference: String,
}

/// Arguments naming a source and a destination reference.
#[derive(Debug, Parser)]
pub struct TransferArgs {
    /// Existing image reference.
    #[arg(required = true)]
    pub source: String,

    /// New image reference.
    #[arg(required = true)]
    pub destination: String,
}

/// Arguments for the `run` subcommand.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Image reference to run.
    #[arg(required = true)]
    pub reference: String,

    /// Container name.
    #[arg(long)]
    pub name: Option<String>,

    /// Publish a port as `[ip:][hostPort:]containerPort[/proto]`.
    #[arg(short = 'p', long = "publish")]
    pub publish: Vec<String>,
}

/// Arguments for the `rm` subcommand.
#[derive(Debug, Parser)]
pub struct RemoveArgs {
    /// Container ID or name to remove.
    #[arg(required = true)]
    pub container: String,
}

/// Arguments for the `images` subcommand.
#[derive(Debug, Parser)]
pub struct ImagesArgs {
    /// Repository to list, for example `ghcr.io/org/app`.
    #[arg(required = true)]
    pub repository: String,
}
