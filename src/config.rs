//! Runtime configuration, read from flags or the environment (`.env` is loaded first).

use clap::Args;

use crate::tasks::event_closer::DEFAULT_CHECK_INTERVAL_SECONDS;

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// SQLite database URL, e.g. `sqlite:campus_vote.db` or `sqlite::memory:`.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:campus_vote.db")]
    pub database_url: String,

    /// How often the background sweep closes events past their end time.
    #[arg(long, env = "CLOSE_CHECK_INTERVAL_SECONDS", default_value_t = DEFAULT_CHECK_INTERVAL_SECONDS)]
    pub close_check_interval_seconds: u64,
}
