use braid_cli::commands::{Cmd, Command};
use clap::Parser;

/// Braid CLI
///
/// Braid marks Python-shaped syntax trees with derived facts (visibility, control flow breaks,
/// variable reads and writes, scope declarations), reorders statements within what those facts
/// allow, and wraps statements in predictable branches
#[derive(Parser)]
#[command(name = "braid")]
#[command(about = "Braid: AST marking and obfuscation")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

/// Runs the Braid CLI with the provided arguments.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.command.execute()
}
