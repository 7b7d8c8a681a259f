use anyhow::Result;
use clap::Parser;

use tandem_route::cli::Cli;

fn main() -> Result<()> {
    env_logger::init();
    Cli::parse().run()
}
