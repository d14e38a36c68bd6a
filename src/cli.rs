use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rask")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scripting language with cross-file includes and host plugins", long_about = None)]
pub struct Args {
    /// Script file to run; without one an interactive session starts
    #[arg(value_name = "SCRIPT")]
    pub script: Option<PathBuf>,

    /// When to color error output
    #[arg(
        long = "color",
        value_name = "WHEN",
        default_value = "auto",
        value_parser = ["auto", "always", "never"]
    )]
    pub color: String,

    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Complete {
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}

impl Args {
    /// Color is forced on or off by `--color`; under `auto` it depends on
    /// both stderr and stdout being terminals, since results go to stdout
    /// while errors go to stderr.
    pub fn color_enabled(&self) -> bool {
        match self.color.as_str() {
            "always" => true,
            "never" => false,
            _ => atty::is(atty::Stream::Stderr) && atty::is(atty::Stream::Stdout),
        }
    }
}
