use clap::{Parser, Subcommand};
use pcb_autoroute::{AutorouteEngine, AutorouteResult, StopFlag};
use pcb_common::db::board::Board;
use pcb_common::db::description::BoardDescription;
use pcb_common::db::{ItemId, NetId};
use pcb_common::util::config::Config;
use pcb_common::util::{check, generator, logger, visualization};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Writes a synthetic board as TOML.
    Generate {
        #[arg(long, default_value = "output/board.toml")]
        output: PathBuf,
    },
    /// Routes every connection of a board once.
    Route {
        /// Board TOML; a synthetic board is generated when missing.
        #[arg(long)]
        board: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    match args.command.unwrap_or(Commands::Route { board: None }) {
        Commands::Generate { output } => {
            let description = generator::generate_board(&config.generator);
            log::info!(
                "Generated {} pins on {} nets, {} keepouts",
                description.pins.len(),
                description.nets.len(),
                description.keepouts.len()
            );
            prepare_output_dir(&output)?;
            std::fs::write(&output, toml::to_string(&description)?)?;
            log::info!("Generated: {:?}", output);
        }
        Commands::Route { board } => {
            let description = match board {
                Some(path) => {
                    log::info!("Reading board from {:?}", path);
                    let text = std::fs::read_to_string(&path)
                        .map_err(|e| anyhow::anyhow!("Failed to read board {:?}: {}", path, e))?;
                    toml::from_str(&text)
                        .map_err(|e| anyhow::anyhow!("Invalid board TOML in {:?}: {}", path, e))?
                }
                None => generator::generate_board(&config.generator),
            };
            run_routing(&config, description)?;
        }
    }

    Ok(())
}

fn prepare_output_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() && !parent.as_os_str().is_empty() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Pins of every net, in board order.
fn net_pins(board: &Board) -> Vec<(NetId, Vec<ItemId>)> {
    (0..board.rules.nets.len())
        .map(|n| {
            let net = NetId::new(n);
            let pins = board
                .items_of_net(net)
                .into_iter()
                .filter(|&id| board.item(id).is_some_and(|i| i.as_pin().is_some()))
                .collect();
            (net, pins)
        })
        .collect()
}

fn run_routing(config: &Config, mut description: BoardDescription) -> anyhow::Result<()> {
    let mut board = description
        .build()
        .map_err(|e| anyhow::anyhow!("Board description is invalid: {}", e))?;
    log::info!(
        "Routing {} items on {} layers",
        board.item_count(),
        board.layer_count()
    );

    let mut engine = AutorouteEngine::new();
    let stop = StopFlag::new();
    let mut counts: BTreeMap<AutorouteResult, usize> = BTreeMap::new();

    for (net, pins) in net_pins(&board) {
        let Some((&first, rest)) = pins.split_first() else {
            continue;
        };
        for &pin in rest {
            // Route into everything already joined to the first pin.
            let dest = board.connected_set(first);
            let start = BTreeSet::from([pin]);
            let result = engine
                .route_connection(&mut board, &start, &dest, net, &config.autoroute, &stop)
                .map_err(|e| anyhow::anyhow!("Autorouting {:?} failed: {}", net, e))?;
            log::debug!("{:?} pin {:?}: {}", net, pin, result);
            *counts.entry(result).or_default() += 1;
        }
    }

    for (result, count) in &counts {
        log::info!("{:<18} {}", result.to_string(), count);
    }
    engine.phase_times().report();
    if cfg!(debug_assertions) {
        engine
            .validate()
            .map_err(|e| anyhow::anyhow!("Search tree is inconsistent: {}", e))?;
    }

    let out_dir = Path::new(&config.output.dir);
    std::fs::create_dir_all(out_dir)?;
    if config.output.render {
        let image = out_dir.join("routed.png");
        log::info!("Rendering {:?}", image);
        let name = image
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Output path {:?} is not UTF-8", image))?;
        visualization::draw_board(&board, name, config.output.image_width)?;
    }

    description.update_routing(&board);
    let routed = out_dir.join("routed.toml");
    log::info!("Writing routed board to {:?}", routed);
    std::fs::write(&routed, toml::to_string(&description)?)?;

    check::run(&board).map_err(|e| anyhow::anyhow!("Verification Failed: {}", e))?;
    log::info!("Wire length: {:.0}", check::wire_length(&board));

    Ok(())
}
