use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[non_exhaustive]
#[derive(Debug, Parser)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
    #[arg(
        short,
        long,
        global = true,
        help = "Custom config file path",
        value_name = "FILE"
    )]
    pub config: Option<PathBuf>,
    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity (-v info, -vv debug, -vvv trace)"
    )]
    pub verbose: u8,
}

#[non_exhaustive]
#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Ask the Gemini-backed gardening guide (default)")]
    Gemini {
        #[arg(
            short,
            long,
            help = "Model identifier, overrides the configured model"
        )]
        model: Option<String>,
        #[arg(
            help = "Question to answer once (reads from stdin if `-`, no question starts interactive mode)"
        )]
        question: Option<String>,
    },
    #[command(about = "Ask the offline dummy backend, which echoes the prompt")]
    Dummy {
        #[arg(
            help = "Question to answer once (reads from stdin if `-`, no question starts interactive mode)"
        )]
        question: Option<String>,
    },
    #[command(about = "Write a default configuration file")]
    Init,
}
