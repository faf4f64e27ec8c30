use clap::Parser;
use semantic_engine::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::CheckConfig(args) => cli::check_config::run(args),
    }
}
