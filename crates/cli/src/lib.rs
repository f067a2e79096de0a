pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "recograph",
    about = "Recograph operator CLI",
    long_about = "Query graph-based product recommendations and inspect engine readiness, \
                  configuration, and the assumed graph schema.",
    after_help = "Examples:\n  recograph recommend cust-1042 --top-k 5\n  recograph recommend laptop --product --json\n  recograph doctor --json\n  recograph schema"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Rank recommendations for a customer or product seed")]
    Recommend {
        #[arg(help = "Seed id (a customer id, or a product id with --product)")]
        seed: String,
        #[arg(long, help = "Treat the seed as a product id instead of a customer id")]
        product: bool,
        #[arg(long, help = "Traversal depth bound (default from config)")]
        max_hops: Option<u32>,
        #[arg(long, help = "Result size bound (default from config)")]
        top_k: Option<usize>,
        #[arg(long, help = "Traversal breadth safety bound (default from config)")]
        max_candidates: Option<usize>,
        #[arg(long, help = "Keep products the customer already purchased")]
        include_owned: bool,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Validate config, query templates, and store connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with credential redaction")]
    Config,
    #[command(about = "Print the graph schema the engine assumes")]
    Schema {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Recommend {
            seed,
            product,
            max_hops,
            top_k,
            max_candidates,
            include_owned,
            json,
        } => commands::recommend::run(commands::recommend::RecommendArgs {
            seed,
            product,
            max_hops,
            top_k,
            max_candidates,
            include_owned,
            json,
        }),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Schema { json } => {
            commands::CommandResult { exit_code: 0, output: commands::schema::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
