use anyhow::{Context, Result, anyhow};
use tracing::warn;

use stat_tables::chess::{ChessClient, ratings_from_json, ratings_table};
use stat_tables::config::StatsConfig;
use stat_tables::fetch::{CancelToken, fetch_documents};
use stat_tables::logging::{init_logging, load_env_files};
use stat_tables::pipeline::guard_length;

fn main() -> Result<()> {
    load_env_files();
    init_logging();

    let usernames = std::env::args()
        .skip(1)
        .map(|arg| arg.trim().to_string())
        .filter(|arg| !arg.is_empty())
        .collect::<Vec<_>>();
    if usernames.is_empty() {
        return Err(anyhow!("usage: chess_ratings <username>..."));
    }

    let config = StatsConfig::from_env();
    let client = ChessClient::new(&config).context("failed to build chess.com client")?;
    let pages = fetch_documents(
        &client,
        &usernames,
        config.fetch_parallelism,
        &CancelToken::new(),
    )?;

    let mut players = Vec::new();
    let mut errors = Vec::new();
    for (username, page) in usernames.iter().zip(pages) {
        let parsed = page.map(|body| ratings_from_json(&body));
        match parsed {
            Some(Ok(found)) => players.push((username.clone(), found)),
            Some(Err(err)) => {
                warn!(username = %username, error = %err, "unreadable chess.com stats");
                errors.push(format!("{username} returned unreadable stats."));
            }
            None => errors.push(format!("{username} is not a valid chess.com username.")),
        }
    }

    let mut out = String::new();
    if !players.is_empty() {
        out.push_str(&ratings_table(&players).to_string());
    }
    if !errors.is_empty() {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&errors.join("\n"));
    }
    println!("{}", guard_length(out, config.message_limit));
    Ok(())
}
