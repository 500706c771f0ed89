use clap::Parser;
use cli::{Cli, Command};
use tokio_util::sync::CancellationToken;

use crate::batches::SystemClock;
use crate::config::Config;
use crate::decoder::GribDecoder;
use crate::harvest::Harvester;
use crate::source::HttpSource;
use crate::store::PgStore;
use crate::units::UnitRegistry;

mod batches;
mod cli;
mod config;
mod cursor;
mod db;
mod decoder;
mod error;
mod field;
mod harvest;
mod repos;
mod retry;
mod sampler;
mod source;
mod store;
#[cfg(test)]
mod testing;
mod units;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Cli::parse();

    if let Err(err) = run(args).await {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> anyhow::Result<()> {
    match &args.cmd {
        Command::Harvest => run_harvest(args.database_url()?).await,
        Command::Cursor => {
            let config = Config::from_env()?;
            let store = PgStore::new(db::pool(args.database_url()?).await?);
            let locations = shared::locations::roster();
            let resume = cursor::resolve(&store, &locations, config.default_start).await?;
            println!(
                "{:?}, next snapshot {}",
                resume.cursor,
                resume.cursor.first_timestamp(config.step())
            );
            for location in &locations {
                match resume.latest(&location.name) {
                    Some(latest) => println!("{:<10} {}", location.name, latest),
                    None => println!("{:<10} -", location.name),
                }
            }
            Ok(())
        }
        Command::Sample { at } => {
            let config = Config::from_env()?;
            let registry = UnitRegistry::standard();
            let units = registry.select(&config.temperature_unit, &config.wind_unit)?;
            let source = http_source(&config)?;
            let locations = shared::locations::roster();

            let samples = harvest::preview(&source, &locations, &units, *at).await?;
            for (location, sample) in locations.iter().zip(samples) {
                println!(
                    "{} {} {}{} {} {}",
                    location.name,
                    sample.time.format("%Y-%m-%d %H:%M:%S"),
                    sample.temperature,
                    units.temperature.symbol,
                    sample.wind,
                    units.wind.symbol
                );
            }
            Ok(())
        }
        Command::Db(db_cmd) => match db_cmd.cmd {
            cli::DbSubCommand::Migrate => db::migrate(args.database_url()?).await,
            cli::DbSubCommand::Reset => db::reset(args.database_url()?).await,
        },
    }
}

fn http_source(config: &Config) -> anyhow::Result<HttpSource> {
    Ok(HttpSource::new(
        &config.base_url,
        config.url_offset_hours,
        config.http_timeout(),
        config.retry(),
        Box::new(GribDecoder),
    )?)
}

async fn run_harvest(database_url: &str) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let registry = UnitRegistry::standard();
    let units = registry.select(&config.temperature_unit, &config.wind_unit)?;
    let locations = shared::locations::roster();
    let source = http_source(&config)?;
    let store = PgStore::new(db::pool(database_url).await?);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, finishing the current snapshot");
                cancel.cancel();
            }
        }
    });

    let harvester = Harvester {
        source: &source,
        store: &store,
        clock: &SystemClock,
        locations: &locations,
        units,
        plan: config.batch_plan(),
        default_start: config.default_start,
    };
    let report = harvester.run(cancel).await?;
    log::info!("{:?}", report);
    Ok(())
}
