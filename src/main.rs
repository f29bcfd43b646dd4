use anyhow::Result;
use clap::Parser;

use chatline::cli::commands::{chat, config, services};
use chatline::cli::{Args, Command};
use chatline::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    match args.command {
        Some(Command::Config { path }) => {
            config::print_settings(path);
        }
        Some(Command::Services) => {
            services::print_services();
        }
        Some(Command::Chat) | None => {
            chat::run_chat().await?;
        }
    }

    Ok(())
}
