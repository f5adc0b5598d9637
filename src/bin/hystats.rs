use anyhow::{Context, Result, anyhow};

use stat_tables::config::StatsConfig;
use stat_tables::fetch::{PageSource, StatPlayer};
use stat_tables::hystats::yesterday_fkdr_message;
use stat_tables::logging::{init_logging, load_env_files};
use stat_tables::resolver::{MojangLookup, Resolver};

fn main() -> Result<()> {
    load_env_files();
    init_logging();

    let token = std::env::args()
        .nth(1)
        .filter(|arg| !arg.trim().is_empty())
        .ok_or_else(|| anyhow!("usage: hystats <player>"))?;

    let config = StatsConfig::from_env();
    let lookup = MojangLookup::new(&config).context("failed to build identity client")?;
    let identity = match Resolver::new(&lookup, &config).resolve(token.trim()) {
        Ok(identity) => identity,
        Err(err) => {
            println!("{err}");
            return Ok(());
        }
    };

    let source = PageSource::new(&config, &config.hystats_url)
        .context("failed to build hystats client")?;
    let player = StatPlayer::new(identity);
    match player.page(&source) {
        Some(page) => println!("{}", yesterday_fkdr_message(player.name(), page)),
        None => println!("HyStats is unavailable right now. Try again later."),
    }
    Ok(())
}
