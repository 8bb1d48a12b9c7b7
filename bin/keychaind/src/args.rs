//! Parses command-line arguments for the keychain service.

use std::path::PathBuf;

use clap::{crate_version, Parser};

#[derive(Debug, Parser)]
#[clap(
    name = "keychaind",
    about = "HD keychain registry service",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration for the service",
        default_value = "config.toml"
    )]
    pub config: PathBuf,
}
