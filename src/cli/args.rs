use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct MainArgs {
    /// The path to the config file (TOML, YAML or JSON)
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    /// The path to a text file containing a list of inputs to execute
    #[clap(long, short)]
    pub script: Option<PathBuf>,

    /// Skip the LLM and interpret typed text directly
    #[clap(long)]
    pub offline: bool,
}
