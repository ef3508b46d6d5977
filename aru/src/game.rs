use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use aurora_core::{
    engine::{EngineSession, LoadPlan, builtin_probes},
    options::Options,
    resource::{ResourceKey, ResourceType},
};
use itertools::Itertools;

use crate::{archive::output_path, locate::locate_game};

#[derive(clap::Args, Debug)]
pub struct SessionArgs {
    /// Path to the game installation
    #[clap(long)]
    game_dir: Option<PathBuf>,
    /// Load plan (RON) to use instead of the built-in one of the detected engine
    #[clap(long)]
    plan: Option<PathBuf>,
    /// Options file (RON map)
    #[clap(long)]
    options: Option<PathBuf>,
    /// Option overrides, like `override=false`
    #[clap(short = 'o', long = "option")]
    option: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct GameCommand {
    #[clap(flatten)]
    session: SessionArgs,
    #[clap(subcommand)]
    action: GameAction,
}

#[derive(clap::Subcommand, Debug)]
enum GameAction {
    /// Tell which engine the installation belongs to
    Probe,
    /// Print the load plan as RON
    Plan,
    /// List the sources registered by the load plan
    Sources,
    /// List every resource with the source it resolves to
    List {
        /// Only list resources with this extension
        #[clap(short, long)]
        extension: Option<String>,
    },
    /// Show which sources provide a resource, like `c_dog.utc`
    Resolve { resource: String },
    /// Extract resources into a directory
    Extract {
        /// Path to the output directory (will be created if it does not exist)
        output_dir: PathBuf,
        /// Resources to extract, like `c_dog.utc`
        resources: Vec<String>,
    },
}

fn parse_key(resource: &str) -> Result<ResourceKey> {
    ResourceKey::from_file_name(resource)
        .with_context(|| format!("{:?} is not a resource name with a known extension", resource))
}

/// Creates a session for the located installation, without initializing it.
fn create_session(args: &SessionArgs) -> Result<EngineSession> {
    let probes = builtin_probes();
    let located = locate_game(args.game_dir.as_deref(), &probes, args.plan.is_some())?;

    let mut options = match &args.options {
        Some(path) => Options::load(path)?,
        None => Options::new(),
    };
    for assignment in &args.option {
        options.set_assignment(assignment)?;
    }

    let session = match (&args.plan, located.probe) {
        (Some(plan), _) => EngineSession::new(&located.game_dir, LoadPlan::load(plan)?),
        (None, Some(probe)) => probe.create_engine(&located.game_dir),
        (None, None) => bail!("No engine claims {:?}", located.game_dir),
    };
    Ok(session.with_options(options))
}

fn init_session(args: &SessionArgs) -> Result<EngineSession> {
    let mut session = create_session(args)?;
    session.init()?;
    Ok(session)
}

pub fn game_command(command: GameCommand) -> Result<()> {
    match command.action {
        GameAction::Probe => {
            let probes = builtin_probes();
            let located = locate_game(command.session.game_dir.as_deref(), &probes, false)?;
            let probe = located
                .probe
                .context("No engine claims the installation")?;
            println!("{} ({:?})", probe.game_name(), located.game_dir);
        }
        GameAction::Plan => {
            let session = create_session(&command.session)?;
            println!("{}", session.plan().to_ron()?);
        }
        GameAction::Sources => {
            let session = init_session(&command.session)?;
            for source in session.resources().sources() {
                println!(
                    "{:>4} {:<4} {:>6} {} ({:?})",
                    source.priority,
                    source.kind.to_string(),
                    source.entry_count,
                    source.label,
                    source.path
                );
            }
        }
        GameAction::List { extension } => {
            let filter = extension
                .map(|ext| {
                    ResourceType::from_extension(&ext)
                        .with_context(|| format!("Unknown extension {:?}", ext))
                })
                .transpose()?;

            let session = init_session(&command.session)?;
            let winners = session
                .resources()
                .winners()
                .into_iter()
                .filter(|entry| filter.is_none_or(|ty| entry.key().ty() == ty))
                .sorted_by(|a, b| {
                    (a.key().ty(), a.key().name()).cmp(&(b.key().ty(), b.key().name()))
                });
            for (ty, entries) in &winners.chunk_by(|entry| entry.key().ty()) {
                let entries = entries.collect_vec();
                println!("{} ({} resources)", ty, entries.len());
                for entry in entries {
                    println!("  {:<24} {}", entry.key(), entry.source().label());
                }
            }
        }
        GameAction::Resolve { resource } => {
            let key = parse_key(&resource)?;
            let session = init_session(&command.session)?;
            let candidates = session.resources().candidates(key.name(), key.ty());
            if candidates.is_empty() {
                bail!("{} is not provided by any source", key);
            }
            // the winner first, then everything it shadows
            for (index, candidate) in candidates.iter().rev().enumerate() {
                let marker = if index == 0 { "*" } else { " " };
                println!(
                    "{} {:>4} {} ({:?})",
                    marker,
                    candidate.priority(),
                    candidate.source().label(),
                    candidate.source().path()
                );
            }
        }
        GameAction::Extract {
            output_dir,
            resources,
        } => {
            let keys = resources
                .iter()
                .map(|name| parse_key(name))
                .collect::<Result<Vec<_>>>()?;
            let session = init_session(&command.session)?;

            std::fs::create_dir_all(&output_dir).context("Creating output directory")?;
            for key in keys {
                let Some(output_path) = output_path(&output_dir, &key.to_string()) else {
                    bail!("Resource name {:?} is not a plain file name", key.name());
                };
                let data = session.resources().read_all(key.name(), key.ty())?;
                std::fs::write(&output_path, data)
                    .with_context(|| format!("Writing {:?}", output_path))?;
                println!("{}", key);
            }
        }
    }

    Ok(())
}
