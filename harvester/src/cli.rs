use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(about = "Weather snapshot harvester.")]
pub struct Cli {
    /// Required by every command except `sample`.
    #[arg(env = "HARVEST_DATABASE_URL", short, long)]
    pub database_url: Option<String>,
    #[command(subcommand)]
    pub cmd: Command,
}

impl Cli {
    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--database-url or HARVEST_DATABASE_URL is required"))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest every snapshot from the resume point up to now.
    Harvest,
    /// Print the resume point computed from the store.
    Cursor,
    /// Fetch one snapshot and print its readings without storing them.
    Sample {
        /// Snapshot time, RFC 3339 (e.g. 2016-03-03T01:00:00Z)
        #[arg(long)]
        at: DateTime<Utc>,
    },
    Db(DbCommand),
}

#[derive(Debug, Parser)]
pub struct DbCommand {
    #[command(subcommand)]
    pub cmd: DbSubCommand,
}

#[derive(Debug, Subcommand)]
pub enum DbSubCommand {
    Reset,
    Migrate,
}
