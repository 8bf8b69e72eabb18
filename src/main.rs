use clap::{Parser, Subcommand};
use deck_builder::bundle_dir::BundleDir;
use deck_builder::content::{ContentProvider, FsContentStore, SortOrder, game_tree};
use deck_builder::generator::Generator;
use deck_builder::imaging::RustBackend;
use deck_builder::{config, output};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "deck-builder")]
#[command(about = "Build Tabletop Simulator bundles from card-game content")]
#[command(long_about = "\
Build Tabletop Simulator bundles from card-game content

Cards are grouped by deck and back image, packed into grid pages (the
bottom-right cell of every page holds the darkened deck backside), and
described in a saved-object JSON document that references the pages.

Data directory:

  data/
  ├── config.toml                      # Optional, see 'gen-config'
  ├── games/
  │   └── base/                        # Game
  │       ├── .info.json
  │       └── core/                    # Collection
  │           ├── .info.json
  │           ├── loot.json            # Deck header + cards
  │           ├── loot.bin             # Deck back image
  │           └── loot/1.bin           # Card face images
  └── result/                          # Written by 'generate', wiped each run
      ├── loot_1_69_10x7.png
      ├── backside_loot_6794e7.png
      └── base.json

Load result/<game>.json in Tabletop Simulator as a saved object.")]
#[command(version)]
struct Cli {
    /// Data directory holding config.toml, the games tree and the result
    #[arg(long, default_value = ".", global = true)]
    data: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the bundle for a game
    Generate {
        /// Game id (its directory name)
        game: String,
        /// Order of collections, decks and cards (defaults to config)
        #[arg(long, value_enum)]
        sort: Option<SortOrder>,
    },
    /// Show the content tree with card counts
    List {
        /// Only this game
        game: Option<String>,
        #[arg(long, value_enum)]
        sort: Option<SortOrder>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Generate { game, sort } => {
            let config = config::load_config(&cli.data)?;
            let sort = sort.unwrap_or(config.bundle.sort);
            let store = FsContentStore::new(config.games_path(&cli.data));
            let out = BundleDir::new(config.result_path(&cli.data))?;
            let generator =
                Generator::new(Arc::new(store), Arc::new(RustBackend::new()), out, config)?;

            let handle = generator.start(&game, sort)?;
            let mut last_line = String::new();
            loop {
                let finished = handle.is_finished();
                let line = output::format_progress(&handle.progress());
                if line != last_line {
                    println!("{}", line);
                    last_line = line;
                }
                if finished {
                    break;
                }
                std::thread::sleep(POLL_INTERVAL);
            }

            let summary = handle.wait()?;
            println!();
            output::print_bundle_summary(&summary);
        }
        Command::List { game, sort } => {
            let config = config::load_config(&cli.data)?;
            let sort = sort.unwrap_or(config.bundle.sort);
            let store = FsContentStore::new(config.games_path(&cli.data));
            let ids: Vec<String> = match game {
                Some(id) => vec![id],
                None => store.games(sort)?.into_iter().map(|g| g.id).collect(),
            };
            let trees = ids
                .iter()
                .map(|id| game_tree(&store, id, sort))
                .collect::<Result<Vec<_>, _>>()?;
            output::print_content_tree(&trees);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
