use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;

use castflow_grid::scene::Scene;
use castflow_grid::{Block, FlowWorld, Grid, NodeKind, Position};
use castflow_route::link::flow_source_of;
use castflow_route::{Activation, RouteConfig, Router};
use castflow_storage::{FileStore, StateStore};

#[derive(Parser)]
#[command(
    name = "castflow",
    about = "Routes molten metal from crucibles through channels into mold tables"
)]
pub struct Args {
    /// Scene file (JSON) describing the grid layout
    pub scene: PathBuf,

    /// Node state file, loaded before and saved after the command
    #[arg(short, long, env = "CASTFLOW_STATE")]
    pub state: Option<PathBuf>,

    /// Cells a channel may drop down a shaft (1-255)
    #[arg(long, env = "CASTFLOW_MAX_DROP")]
    pub max_drop: Option<u8>,

    /// Print the routing report when done
    #[arg(short, long)]
    pub report: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start a flow from the crucible next to a channel
    Activate { at: Position },
    /// Power a channel (or remove power with --off); activates on power-up
    Signal {
        at: Position,
        #[arg(long)]
        off: bool,
    },
    /// Destroy a channel
    BreakConduit { at: Position },
    /// Destroy a mold table
    BreakSink { at: Position },
    /// Advance every mold table
    Tick {
        #[arg(default_value = "1")]
        ticks: u64,
        /// Game time of the first tick
        #[arg(long, default_value = "0")]
        start: u64,
    },
    /// Check whether the link chain from a node up to its crucible is intact
    Check { at: Position },
    /// Print every node and its flow state
    Show,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = RouteConfig::from_env();
    if let Some(max_drop) = args.max_drop {
        config = config.with_max_drop(max_drop);
    }
    info!("Routing with {}", config);
    let router = Router::new(config);

    let scene = Scene::load(&args.scene)?;
    let mut grid = scene
        .build()
        .with_context(|| format!("Invalid scene {}", args.scene.display()))?;

    let store = args
        .state
        .as_ref()
        .map(|path| FileStore::new(path).with_metrics(router.metrics()));
    if let Some(store) = &store {
        if let Some(snapshot) = store.load_snapshot()? {
            let applied = grid.restore(&snapshot);
            info!("Restored {} nodes from {}", applied, store.path().display());
        }
    }

    run(&router, &mut grid, &args.command)?;

    if let Some(store) = &store {
        store
            .save_snapshot(&grid.snapshot())
            .with_context(|| format!("Failed to save state to {}", store.path().display()))?;
    }
    if args.report {
        println!("{}", router.metrics().generate_report());
    }
    Ok(())
}

fn run(router: &Router, grid: &mut Grid, command: &Command) -> Result<()> {
    match *command {
        Command::Activate { at } => report_activation(at, router.activate(grid, at)?),
        Command::Signal { at, off } => match router.set_signal(grid, at, !off)? {
            Some(activation) => report_activation(at, Some(activation)),
            None => println!("Signal at {} set to {}, nothing activated", at, !off),
        },
        Command::BreakConduit { at } => {
            if !grid.is_conduit(at) {
                bail!("No channel at {}", at);
            }
            let cleared = router.remove_conduit(grid, at);
            println!("Removed channel at {}, {} channels stopped flowing", at, cleared);
        }
        Command::BreakSink { at } => {
            if !grid.is_sink(at) {
                bail!("No mold table at {}", at);
            }
            let cleared = router.remove_sink(grid, at);
            println!("Removed mold table at {}, {} channels stopped flowing", at, cleared);
        }
        Command::Tick { ticks, start } => {
            let mut casts = 0;
            let mut drawn = 0;
            for game_time in start..start + ticks {
                let summary = router.tick(grid, game_time);
                casts += summary.casts;
                drawn += summary.drawn;
            }
            println!("Ran {} ticks: {} mB drawn, {} casts finished", ticks, drawn, casts);
        }
        Command::Check { at } => {
            let state = if router.link_is_broken(&*grid, at) { "broken" } else { "intact" };
            println!("{} link at {} is {}", node_name(grid, at), at, state);
        }
        Command::Show => {
            for line in describe(router, grid) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn report_activation(at: Position, activation: Option<Activation>) {
    match activation {
        Some(activation) if activation.is_empty() => {
            println!(
                "Nothing routed from {} ({} mold tables filtered)",
                activation.source,
                activation.filtered.len()
            );
        }
        Some(activation) => {
            println!(
                "Routed {} from {} to {} mold tables through {} channels ({} hops)",
                activation.fluid.as_ref().map_or("?", |f| f.as_str()),
                activation.source,
                activation.sinks.len(),
                activation.conduits,
                activation.hops
            );
            for sink in &activation.sinks {
                println!("  -> {}", sink);
            }
        }
        None => println!("No crucible next to {}", at),
    }
}

fn node_name(grid: &Grid, pos: Position) -> &'static str {
    match grid.node_kind(pos) {
        NodeKind::Conduit => "Channel",
        NodeKind::Sink => "Mold table",
        NodeKind::Source => "Crucible",
        NodeKind::Other => "Block",
        NodeKind::Empty => "Empty",
    }
}

/// One line per node, in position order.
fn describe(router: &Router, grid: &Grid) -> Vec<String> {
    let mut positions = grid.positions();
    positions.sort();

    let mut lines = Vec::with_capacity(positions.len());
    for pos in positions {
        let line = match grid.get(pos) {
            Some(Block::Crucible(crucible)) => match &crucible.contents {
                Some(contents) => format!(
                    "{} crucible {} x{} at {:.0}C{}",
                    pos,
                    contents.fluid,
                    contents.amount,
                    crucible.temperature,
                    if crucible.molten { "" } else { " (solid)" }
                ),
                None => format!("{} crucible empty", pos),
            },
            Some(Block::Channel(channel)) => {
                let sides: Vec<&str> =
                    router.connections(grid, pos).iter().map(|d| d.name()).collect();
                match channel.flow_source() {
                    Some(link) => format!(
                        "{} channel {} from {} x{} refs={} [{}]",
                        pos,
                        channel.fluid().map_or("?", |f| f.as_str()),
                        link.direction,
                        link.distance,
                        channel.ref_count(),
                        sides.join(",")
                    ),
                    None => format!("{} channel idle [{}]", pos, sides.join(",")),
                }
            }
            Some(Block::MoldTable(table)) => {
                let amount = table.mold.as_ref().map_or(0, |m| m.amount());
                let capacity = table.mold.as_ref().map_or(0, |m| m.capacity);
                let state = match (table.link(), &table.output) {
                    (_, Some(output)) => format!("holds {}", output),
                    (Some(link), None) => format!(
                        "drawing {} from {} via {}",
                        link.fluid,
                        link.source,
                        flow_source_of(grid, pos)
                            .map_or_else(String::new, |l| l.direction.to_string())
                    ),
                    (None, None) => "idle".to_string(),
                };
                format!(
                    "{} mold table {}/{} {} signal={}",
                    pos,
                    amount,
                    capacity,
                    state,
                    table.signal_level()
                )
            }
            Some(Block::Obstacle(name)) => format!("{} {}", pos, name),
            None => continue,
        };
        lines.push(line);
    }
    lines
}
