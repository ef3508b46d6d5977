mod archive;
mod game;
mod locate;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

use crate::{archive::ArchiveCommand, game::GameCommand};

#[derive(clap::Parser, Debug)]
struct Args {
    #[clap(subcommand)]
    action: AruAction,
}

#[derive(clap::Subcommand, Debug)]
enum AruAction {
    /// Inspect a single archive
    #[clap(subcommand)]
    Archive(ArchiveCommand),
    /// Work with the resources of a game installation
    Game(GameCommand),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .compact()
        .init();
    let args = Args::parse();
    match args.action {
        AruAction::Archive(cmd) => archive::archive_command(cmd),
        AruAction::Game(cmd) => game::game_command(cmd),
    }
}
