/*!
 * execfs - Main Entry Point
 * Parses the configuration, builds the entry registry, and mounts
 */

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use execfs::{Config, ExecFs, MountIdentity, Registry};

#[derive(Debug, Parser)]
#[command(name = "execfs", about = "Mount a filesystem of command-backed files")]
struct Args {
    /// Path to the JSON configuration file
    config: PathBuf,

    /// Directory to mount the filesystem on
    mountpoint: PathBuf,

    /// Allow other users to access the mount
    #[arg(long)]
    allow_other: bool,

    /// Unmount automatically when the process exits
    #[arg(long)]
    auto_unmount: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let registry = Arc::new(Registry::new(config.entries.clone()));
    let mount_identity = MountIdentity::current();

    info!(
        entries = registry.len(),
        uid = mount_identity.uid,
        gid = mount_identity.gid,
        mountpoint = %args.mountpoint.display(),
        "mounting execfs"
    );

    let fs = ExecFs::new(registry, mount_identity, config.size);
    execfs::mount(fs, &args.mountpoint, args.allow_other, args.auto_unmount)
        .with_context(|| format!("mounting at {}", args.mountpoint.display()))?;

    Ok(())
}
