use std::env;
use std::time::Duration;

use crate::table::Justify;

const PROFILES_URL: &str = "https://api.mojang.com/profiles/minecraft";
const SESSION_URL: &str = "https://sessionserver.mojang.com/session/minecraft/profile";
const PLANCKE_URL: &str = "https://plancke.io/hypixel/player/stats";
const HYSTATS_URL: &str = "https://hystats.net/player/bedwars";
const CHESS_URL: &str = "https://api.chess.com/pub/player";

const REQUEST_TIMEOUT_SECS: u64 = 10;
const ID_LENGTH_THRESHOLD: usize = 16;
const MESSAGE_LIMIT: usize = 2000;
const MAX_IN_FLIGHT: usize = 64;

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub profiles_url: String,
    pub session_url: String,
    pub plancke_url: String,
    pub hystats_url: String,
    pub chess_url: String,
    pub request_timeout: Duration,
    // Upper bound on concurrent page fetches. Batches up to this size are fully fanned out.
    pub fetch_parallelism: usize,
    // Tokens longer than this are treated as uuids rather than usernames.
    pub id_length_threshold: usize,
    pub message_limit: usize,
    pub justify: Justify,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            profiles_url: PROFILES_URL.to_string(),
            session_url: SESSION_URL.to_string(),
            plancke_url: PLANCKE_URL.to_string(),
            hystats_url: HYSTATS_URL.to_string(),
            chess_url: CHESS_URL.to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            fetch_parallelism: MAX_IN_FLIGHT,
            id_length_threshold: ID_LENGTH_THRESHOLD,
            message_limit: MESSAGE_LIMIT,
            justify: Justify::Right,
        }
    }
}

impl StatsConfig {
    /// Defaults overridden by whatever is set in the environment.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(url) = env_string("STATS_PROFILES_URL") {
            cfg.profiles_url = url;
        }
        if let Some(url) = env_string("STATS_SESSION_URL") {
            cfg.session_url = url;
        }
        if let Some(url) = env_string("STATS_PLANCKE_URL") {
            cfg.plancke_url = url;
        }
        if let Some(url) = env_string("STATS_HYSTATS_URL") {
            cfg.hystats_url = url;
        }
        if let Some(url) = env_string("STATS_CHESS_URL") {
            cfg.chess_url = url;
        }
        if let Some(secs) = env_parse::<u64>("STATS_TIMEOUT_SECS") {
            cfg.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(threads) = env_parse::<usize>("FETCH_PARALLELISM") {
            cfg.fetch_parallelism = threads;
        }
        cfg.fetch_parallelism = cfg.fetch_parallelism.clamp(1, MAX_IN_FLIGHT);
        if let Some(limit) = env_parse::<usize>("STATS_MESSAGE_LIMIT") {
            cfg.message_limit = limit;
        }
        cfg
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().trim_end_matches('/').to_string())
        .filter(|val| !val.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse::<T>().ok())
}
