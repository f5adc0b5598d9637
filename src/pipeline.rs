use tracing::{info, warn};

use crate::archetype::Archetype;
use crate::config::StatsConfig;
use crate::error::{NO_PLAYERS_MESSAGE, Result, StatsError};
use crate::fetch::{CancelToken, StatPageSource, StatPlayer, fetch_players};
use crate::formula::{SENTINEL, evaluate_row};
use crate::parse::{StatTable, parse_stat_table};
use crate::resolver::{IdentityLookup, Resolver};
use crate::table::{DisplayTable, Justify};

/// Row the players are ranked on (the first stat row under the header).
const RANK_ROW: usize = 1;

/// Builds the grid: a header of player names, then one row per formula.
/// Players without a parsed table get the sentinel in every row.
pub fn assemble_table(
    archetype: &Archetype,
    players: &[(String, Option<StatTable>)],
    justify: Justify,
) -> DisplayTable {
    let mut table = DisplayTable::new(justify);
    table.push(
        std::iter::once(String::new()).chain(players.iter().map(|(name, _)| name.clone())),
    );

    for spec in archetype.row_specs() {
        let mut row = Vec::with_capacity(players.len() + 1);
        row.push(spec.label.clone());
        for (_, stats) in players {
            row.push(match stats {
                Some(stats) => evaluate_row(&spec, stats),
                None => SENTINEL.to_string(),
            });
        }
        table.push(row);
    }
    table
}

/// The text unchanged if it fits in `limit` characters, otherwise a notice
/// asking for a narrower request.
pub fn guard_length(text: String, limit: usize) -> String {
    let len = text.chars().count();
    if len <= limit {
        return text;
    }
    format!(
        "The result is too long to display ({len} characters, limit {limit}). \
         Please request fewer players or a more specific mode."
    )
}

pub fn parse_player(player: &StatPlayer, archetype: &Archetype) -> Option<StatTable> {
    let page = player.cached_page()?;
    match parse_stat_table(page, archetype) {
        Ok(stats) => Some(stats),
        Err(err) => {
            warn!(
                player = %player.name(),
                id = %player.identity.canonical_id,
                error = %err,
                "stat page did not match the expected layout"
            );
            None
        }
    }
}

pub struct StatPipeline<'a, L: IdentityLookup + ?Sized, S: StatPageSource + ?Sized> {
    config: &'a StatsConfig,
    lookup: &'a L,
    source: &'a S,
}

impl<'a, L: IdentityLookup + ?Sized, S: StatPageSource + ?Sized> StatPipeline<'a, L, S> {
    pub fn new(config: &'a StatsConfig, lookup: &'a L, source: &'a S) -> Self {
        Self {
            config,
            lookup,
            source,
        }
    }

    /// Ranked table for every resolvable token, then one warning line per token that wasn't.
    ///
    /// Fails only when no token resolves or the request is cancelled.
    pub fn stat_report(
        &self,
        tokens: &[String],
        archetype: &Archetype,
        cancel: &CancelToken,
    ) -> Result<String> {
        let resolution = Resolver::new(self.lookup, self.config).resolve_all(tokens);
        if resolution.players.is_empty() {
            info!(tokens = tokens.len(), "no players resolved");
            return Err(StatsError::NoPlayers {
                warnings: resolution.warnings,
            });
        }
        let warnings = resolution.warnings;

        let players = fetch_players(
            self.source,
            resolution.players,
            self.config.fetch_parallelism,
            cancel,
        )?;

        let parsed: Vec<(String, Option<StatTable>)> = players
            .iter()
            .map(|player| (player.name().to_string(), parse_player(player, archetype)))
            .collect();

        let table = assemble_table(archetype, &parsed, self.config.justify)
            .sorted_players_by_row(RANK_ROW);

        let mut result = table.to_string();
        if !warnings.is_empty() {
            result.push_str("\n\n");
            result.push_str(&warnings.join("\n"));
        }
        info!(
            archetype = archetype.name,
            players = parsed.len(),
            warnings = warnings.len(),
            "built stat table"
        );
        Ok(guard_length(result, self.config.message_limit))
    }

    pub fn stat_report_for(
        &self,
        token: &str,
        archetype: &Archetype,
        cancel: &CancelToken,
    ) -> Result<String> {
        self.stat_report(&[token.to_string()], archetype, cancel)
    }

    /// The user-facing reply, errors included. Cancellation yields nothing to send.
    pub fn reply(
        &self,
        tokens: &[String],
        archetype: &Archetype,
        cancel: &CancelToken,
    ) -> Option<String> {
        match self.stat_report(tokens, archetype, cancel) {
            Ok(text) => Some(text),
            Err(StatsError::Cancelled) => None,
            Err(StatsError::NoPlayers { warnings }) => {
                let mut text = NO_PLAYERS_MESSAGE.to_string();
                if !warnings.is_empty() {
                    text.push_str("\n\n");
                    text.push_str(&warnings.join("\n"));
                }
                Some(guard_length(text, self.config.message_limit))
            }
            Err(err) => Some(format!("Could not build the stat table: {err}")),
        }
    }
}
