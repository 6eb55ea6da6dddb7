use std::process;

use clap::Parser;

use facecloak_cli::{init_logging, run_annotate, AnnotateCli};

fn main() {
    init_logging();

    let cli = AnnotateCli::parse();
    if let Err(e) = run_annotate(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
