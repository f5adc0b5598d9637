use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

pub const NO_PLAYERS_MESSAGE: &str = "None of the given players could be found.";

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("{0} is too long to be a username, and it is not a valid UUID.")]
    UnknownIdentifier(String),

    #[error("{0} is not a valid Minecraft username.")]
    UnknownUsername(String),

    #[error("stat page for {category} is malformed: {reason}")]
    MalformedDocument { category: String, reason: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("{}", NO_PLAYERS_MESSAGE)]
    NoPlayers { warnings: Vec<String> },
}

impl StatsError {
    pub fn malformed(category: &str, reason: impl Into<String>) -> Self {
        StatsError::MalformedDocument {
            category: category.to_string(),
            reason: reason.into(),
        }
    }

    /// Per-player input errors that a batch collects as warnings.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            StatsError::UnknownIdentifier(_) | StatsError::UnknownUsername(_)
        )
    }
}
