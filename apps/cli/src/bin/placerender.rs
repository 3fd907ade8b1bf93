//! placerender: batch-render map images for a list of named places.

use clap::Parser;

use placerender_cli::{init_logging, render, CliError, RenderArgs};

fn main() {
    let args = RenderArgs::parse();
    init_logging();

    let result = args
        .into_config()
        .map_err(CliError::from)
        .and_then(|config| render(&config));
    if let Err(e) = result {
        e.exit();
    }
}
