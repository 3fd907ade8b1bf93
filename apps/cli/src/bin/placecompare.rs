//! placecompare: diff two placerender output trees with ImageMagick.

use clap::Parser;

use placerender_cli::{compare, init_logging, CliError, CompareArgs};

fn main() {
    let args = CompareArgs::parse();
    init_logging();

    let result = args
        .into_config()
        .map_err(CliError::from)
        .and_then(|config| compare(&config));
    if let Err(e) = result {
        e.exit();
    }
}
