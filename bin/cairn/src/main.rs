//! cairn block store binary.

mod cli;

use clap::Parser;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = cli::Cli::parse();
    cairn_observability::init_logging(&cli.logs)?;
    cli::run(cli).await
}
