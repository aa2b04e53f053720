use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use player_cards::{Config, SourceSpec};

#[derive(Parser, Debug)]
#[command(
    name = "player-cards",
    version,
    about = "Caption player photos with their name and position"
)]
struct Cli {
    /// SQLite database holding the players table
    #[arg(long = "db", conflicts_with = "records")]
    db: Option<PathBuf>,

    /// Query returning id, name, position and photo path (overrides settings)
    #[arg(short = 'q', long = "query", requires = "db")]
    query: Option<String>,

    /// JSON file with an array of player records
    #[arg(long = "records")]
    records: Option<PathBuf>,

    /// Directory for the captioned cards (created if missing)
    #[arg(short = 'o', long = "output", default_value = "./tmpo")]
    output: PathBuf,

    /// Bold TTF/OTF font for the caption text
    #[arg(long = "font")]
    font: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    player_cards::logging::init(cli.verbose)?;

    let source = match (cli.db, cli.records) {
        (Some(path), None) => SourceSpec::Sqlite {
            path,
            query: cli.query,
        },
        (None, Some(path)) => SourceSpec::Json { path },
        _ => return Err(anyhow!("pass either --db or --records")),
    };

    let summary = player_cards::run(Config {
        source,
        output_dir: cli.output,
        font_path: cli.font,
        settings_path: cli.read_settings,
    })?;

    for skipped in summary.skipped() {
        eprintln!("skipped {} ({}): {}", skipped.id, skipped.category, skipped.message);
    }
    println!("{}", summary);
    Ok(())
}
