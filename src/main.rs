// Proof-of-work miner - CLI

use clap::Parser;
use pow_miner::{Cli, CliHandler};

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let handler = CliHandler::new();

    if let Err(e) = handler.handle(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
