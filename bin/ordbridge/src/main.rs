//! Ordbridge binary entrypoint.

use anyhow::{anyhow, Result};
use argh::from_env;

use crate::{args::Args, config::Config};

mod args;
mod config;
mod logging;
mod services;
mod transport;

fn main() -> Result<()> {
    let args: Args = from_env();

    logging::init();

    // Bad configuration is fatal before any service starts.
    let mut config = Config::from_env().map_err(|e| anyhow!("configuration error: {e}"))?;
    args.apply(&mut config);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("ordbridge-rt")
        .build()?;

    rt.block_on(services::run(config))
}
