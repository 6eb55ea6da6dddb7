use std::process;

use clap::Parser;

use facecloak_cli::{init_logging, run_blur, BlurCli};

fn main() {
    init_logging();

    let cli = BlurCli::parse();
    if let Err(e) = run_blur(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
