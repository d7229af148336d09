//! modpack: resolve, load and inspect game content packages.

use clap::{ArgAction, Parser};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "modpack",
    version,
    about = "Resolve, load and inspect a set of game content packages"
)]
struct Cli {
    #[command(flatten)]
    overrides: modpack_cli::cli::Overrides,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: modpack_cli::cli::Commands,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = modpack_cli::cli::dispatch(cli.command, &cli.overrides) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
