use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chatline")]
#[command(about = "Chat with LLM backends from a single command line")]
#[command(version)]
pub struct Args {
    /// Log debug diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start an interactive chat session (default)
    Chat,
    /// Show the saved settings
    Config {
        /// Print only the settings file path
        #[arg(long)]
        path: bool,
    },
    /// List supported services and the settings each one needs
    Services,
}
