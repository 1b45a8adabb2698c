//! CLI argument parsing. The environment is the primary configuration
//! surface; flags exist for the handful of settings that change between
//! local runs.

use std::path::PathBuf;

use argh::FromArgs;

use crate::config::Config;

#[derive(Clone, Debug, FromArgs)]
#[argh(description = "Ordinals inscription indexer and burn bridge")]
pub(crate) struct Args {
    /// database path that overrides DATABASE_URL
    #[argh(option, short = 'd', description = "database path overriding DATABASE_URL")]
    pub database: Option<PathBuf>,

    /// height to begin indexing from, overriding START_HEIGHT
    #[argh(option, description = "height to begin indexing from")]
    pub start_height: Option<u64>,
}

impl Args {
    pub(crate) fn apply(&self, config: &mut Config) {
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if let Some(start_height) = self.start_height {
            config.start_height = start_height;
        }
    }
}
