use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::StatsConfig;
use crate::error::{Result, StatsError};
use crate::fetch::StatPageSource;
use crate::http_client::build_http_client;
use crate::table::{DisplayTable, Justify};

const MODE_PREFIX: &str = "chess_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub win: u32,
    #[serde(default)]
    pub loss: u32,
    #[serde(default)]
    pub draw: u32,
}

#[derive(Debug, Deserialize)]
struct RatingPoint {
    rating: u32,
}

#[derive(Debug, Deserialize)]
struct ModeStats {
    last: Option<RatingPoint>,
    best: Option<RatingPoint>,
    record: Option<Record>,
}

/// Ratings for one time control (`chess_blitz` -> `blitz`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChessRating {
    pub title: String,
    pub last: Option<u32>,
    pub best: Option<u32>,
    pub record: Option<Record>,
}

pub struct ChessClient {
    client: Client,
    base_url: String,
}

impl ChessClient {
    pub fn new(config: &StatsConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.chess_url.trim_end_matches('/').to_string(),
        })
    }

    /// Raw stats object, or `None` for an unknown user.
    pub fn user_stats(&self, username: &str) -> Result<Option<Value>> {
        match self.fetch(username) {
            Ok(body) => Ok(Some(serde_json::from_str(&body)?)),
            Err(StatsError::Status { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl StatPageSource for ChessClient {
    fn fetch(&self, username: &str) -> Result<String> {
        let url = format!("{}/{}/stats", self.base_url, username.to_lowercase());
        let resp = self.client.get(&url).send()?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(StatsError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(resp.text()?)
    }
}

pub fn ratings(stats: &Value) -> Vec<ChessRating> {
    let Some(map) = stats.as_object() else {
        return Vec::new();
    };
    ratings_from_map(map)
}

pub fn ratings_from_json(body: &str) -> Result<Vec<ChessRating>> {
    let stats: Value = serde_json::from_str(body)?;
    Ok(ratings(&stats))
}

fn ratings_from_map(map: &Map<String, Value>) -> Vec<ChessRating> {
    map.iter()
        .filter_map(|(key, value)| {
            let title = key.strip_prefix(MODE_PREFIX)?;
            if title.is_empty() || !title.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return None;
            }
            let mode = serde_json::from_value::<ModeStats>(value.clone()).ok()?;
            Some(ChessRating {
                title: title.to_string(),
                last: mode.last.map(|p| p.rating),
                best: mode.best.map(|p| p.rating),
                record: mode.record,
            })
        })
        .collect()
}

pub fn record_string(record: &Record) -> String {
    format!("{}/{}/{}", record.win, record.loss, record.draw)
}

fn title_case(raw: &str) -> String {
    raw.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One column per player; rating, best and W/L/D rows per time control.
pub fn ratings_table(players: &[(String, Vec<ChessRating>)]) -> DisplayTable {
    let mut titles: Vec<&str> = Vec::new();
    for (_, player_ratings) in players {
        for rating in player_ratings {
            if !titles.contains(&rating.title.as_str()) {
                titles.push(&rating.title);
            }
        }
    }

    let mut table = DisplayTable::new(Justify::Right);
    table.push(
        std::iter::once(String::new()).chain(players.iter().map(|(name, _)| name.clone())),
    );

    let dash = || "-".to_string();
    for title in titles {
        let label = title_case(title);
        let find = |player: &[ChessRating]| player.iter().find(|r| r.title == title).cloned();

        let mut rating_row = vec![format!("{label} Rating")];
        let mut best_row = vec![format!("{label} Best")];
        let mut record_row = vec![format!("{label} W/L/D")];
        for (_, player_ratings) in players {
            let found = find(player_ratings.as_slice());
            rating_row.push(
                found
                    .as_ref()
                    .and_then(|r| r.last)
                    .map_or_else(dash, |v| v.to_string()),
            );
            best_row.push(
                found
                    .as_ref()
                    .and_then(|r| r.best)
                    .map_or_else(dash, |v| v.to_string()),
            );
            record_row.push(
                found
                    .as_ref()
                    .and_then(|r| r.record.as_ref())
                    .map_or_else(dash, record_string),
            );
        }
        table.push(rating_row);
        table.push(best_row);
        table.push(record_row);
    }
    table
}
