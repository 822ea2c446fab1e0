pub mod choropleth;
pub mod cli;
pub mod color;
pub mod flag;
pub mod geo;
pub mod ingest;
pub mod inspect;
pub mod io_utils;
pub mod locale;
pub mod observation;
pub mod rank;
pub mod sector;
pub mod series;
pub mod stats;
pub mod table;
pub mod tooltip;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("rd_atlas", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Rank(args) => rank::execute(&args),
        Commands::Map(args) => choropleth::execute(&args),
        Commands::Stats(args) => stats::execute(&args),
        Commands::Tooltip(args) => tooltip::execute(&args),
        Commands::Inspect(args) => inspect::execute(&args),
    }
}
