pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "recall",
    about = "Recall operator CLI",
    long_about = "Operate Recall's unarchive workflow store: migrations, demo fixtures, template inspection, and smoke validation.",
    after_help = "Examples:\n  recall migrate\n  recall templates\n  recall smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load deterministic demo unarchive requests into the configured database")]
    Seed,
    #[command(about = "Run end-to-end readiness checks with per-check timing details")]
    Smoke,
    #[command(about = "List the workflow templates available to new requests")]
    Templates,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Templates => commands::templates::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
