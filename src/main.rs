//! frost-link CLI
//!
//! Resolves SensorThings API navigation links to @iot.ids.

use anyhow::Result;
use clap::{Parser, Subcommand};
use frost_link::expand::{run_expand, ExpandArgs};
use frost_link::logging;
use frost_link::resolve::{run_resolve, ResolveArgs};

#[derive(Parser)]
#[command(name = "frost-link")]
#[command(version)]
#[command(about = "Resolve SensorThings API navigation links to @iot.ids")]
#[command(long_about = "Follows FROST @iot.navigationLink URLs and prints the @iot.ids they reference.\n\nCommands:\n  resolve   Resolve navigation links to ids\n  expand    Resolve every navigation link of an entity document")]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve navigation links given on the command line, stdin, or in a file
    Resolve(ResolveArgs),
    /// Resolve every navigation link of a FROST entity JSON document
    Expand(ExpandArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Resolve(args) => run_resolve(args).await,
        Commands::Expand(args) => run_expand(args).await,
    }
}
