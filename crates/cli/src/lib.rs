pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "basketry",
    about = "Basketry operator CLI",
    long_about = "Operate the Basketry recommendation engine: migrations, demo seeds, mining passes, and rule inspection.",
    after_help = "Examples:\n  basketry doctor --json\n  basketry mine --force\n  basketry recommend --tokens prod-beans-espresso"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog and order history")]
    Seed,
    #[command(about = "Run a mining pass and report the resulting rule count")]
    Mine {
        #[arg(long, help = "Recompute even when the cached rule set is still fresh")]
        force: bool,
    },
    #[command(about = "Rank cart-based recommendations for a set of item tokens")]
    Recommend {
        #[arg(long, value_delimiter = ',', help = "Cart item tokens (comma separated)")]
        tokens: Vec<String>,
        #[arg(long, help = "Maximum number of recommendations")]
        limit: Option<usize>,
    },
    #[command(about = "Print the current association rule set for diagnostics")]
    Rules,
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "Validate config, mining thresholds, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Mine { force } => commands::mine::run(force),
        Command::Recommend { tokens, limit } => commands::recommend::run(tokens, limit),
        Command::Rules => commands::rules::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
