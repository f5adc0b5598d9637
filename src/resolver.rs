use std::collections::HashMap;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::StatsConfig;
use crate::error::{Result, StatsError};
use crate::http_client::build_http_client;

// The profiles endpoint rejects bodies with more names than this.
const FORWARD_BATCH_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub canonical_id: String,
    pub display_name: String,
}

/// Name/id lookup against an identity service.
pub trait IdentityLookup: Sync {
    /// Batch name -> identity. Names without a match are simply absent from the result.
    fn forward(&self, names: &[String]) -> Result<Vec<PlayerIdentity>>;

    fn reverse(&self, id: &str) -> Result<Option<PlayerIdentity>>;
}

#[derive(Debug, Deserialize)]
struct ProfileRecord {
    id: String,
    name: String,
}

impl From<ProfileRecord> for PlayerIdentity {
    fn from(record: ProfileRecord) -> Self {
        PlayerIdentity {
            canonical_id: record.id,
            display_name: record.name,
        }
    }
}

pub struct MojangLookup {
    client: Client,
    profiles_url: String,
    session_url: String,
}

impl MojangLookup {
    pub fn new(config: &StatsConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            profiles_url: config.profiles_url.clone(),
            session_url: config.session_url.clone(),
        })
    }
}

impl IdentityLookup for MojangLookup {
    fn forward(&self, names: &[String]) -> Result<Vec<PlayerIdentity>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let resp = self.client.post(&self.profiles_url).json(names).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StatsError::Status {
                url: self.profiles_url.clone(),
                status: status.as_u16(),
            });
        }
        let body = resp.text()?;
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<ProfileRecord> = serde_json::from_str(trimmed)?;
        Ok(records.into_iter().map(PlayerIdentity::from).collect())
    }

    fn reverse(&self, id: &str) -> Result<Option<PlayerIdentity>> {
        let url = format!("{}/{}", self.session_url, id);
        let resp = self.client.get(&url).send()?;
        let status = resp.status();
        if matches!(
            status,
            StatusCode::NO_CONTENT | StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND
        ) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StatsError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = resp.text()?;
        // Malformed ids come back as an empty or non-profile body.
        Ok(serde_json::from_str::<ProfileRecord>(body.trim())
            .ok()
            .map(PlayerIdentity::from))
    }
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub players: Vec<PlayerIdentity>,
    pub warnings: Vec<String>,
}

pub struct Resolver<'a, L: IdentityLookup + ?Sized> {
    lookup: &'a L,
    id_length_threshold: usize,
}

impl<'a, L: IdentityLookup + ?Sized> Resolver<'a, L> {
    pub fn new(lookup: &'a L, config: &StatsConfig) -> Self {
        Self {
            lookup,
            id_length_threshold: config.id_length_threshold,
        }
    }

    pub fn is_identifier(&self, token: &str) -> bool {
        token.chars().count() > self.id_length_threshold
    }

    pub fn resolve(&self, token: &str) -> Result<PlayerIdentity> {
        if self.is_identifier(token) {
            return self
                .lookup
                .reverse(token)?
                .ok_or_else(|| StatsError::UnknownIdentifier(token.to_string()));
        }
        self.forward_one(token)?
            .ok_or_else(|| StatsError::UnknownUsername(token.to_string()))
    }

    /// Resolves every token, keeping input order. Failures become warning lines.
    pub fn resolve_all(&self, tokens: &[String]) -> Resolution {
        let names: Vec<String> = tokens
            .iter()
            .filter(|t| !self.is_identifier(t))
            .cloned()
            .collect();
        let (by_name, failures) = self.forward_batched(&names);

        let mut out = Resolution::default();
        for token in tokens {
            let resolved = if self.is_identifier(token) {
                self.resolve(token)
            } else {
                let key = token.to_lowercase();
                if let Some(reason) = failures.get(&key) {
                    out.warnings
                        .push(format!("{token} could not be resolved: {reason}"));
                    continue;
                }
                by_name
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| StatsError::UnknownUsername(token.clone()))
            };
            match resolved {
                Ok(identity) => {
                    debug!(token = %token, id = %identity.canonical_id, "resolved player");
                    out.players.push(identity);
                }
                Err(err) => {
                    if !err.is_input_error() {
                        warn!(token = %token, error = %err, "player lookup failed");
                    }
                    out.warnings.push(warning_line(token, &err));
                }
            }
        }
        out
    }

    /// Batched forward lookups. A rejected batch is retried one name at a time so a
    /// single bad name only fails itself. Failures are keyed by lowercased name.
    fn forward_batched(
        &self,
        names: &[String],
    ) -> (HashMap<String, PlayerIdentity>, HashMap<String, String>) {
        let mut by_name = HashMap::new();
        let mut failures = HashMap::new();
        for chunk in names.chunks(FORWARD_BATCH_LIMIT) {
            let err = match self.lookup.forward(chunk) {
                Ok(found) => {
                    for identity in found {
                        by_name.insert(identity.display_name.to_lowercase(), identity);
                    }
                    continue;
                }
                Err(err) => err,
            };
            warn!(error = %err, names = chunk.len(), "batch lookup failed");

            let retried: Vec<(&String, Result<Option<PlayerIdentity>>)> = match chunk {
                [name] => vec![(name, single_match(Err(err), name))],
                _ => chunk.iter().map(|name| (name, self.forward_one(name))).collect(),
            };
            for (name, single) in retried {
                match single {
                    Ok(Some(identity)) => {
                        by_name.insert(name.to_lowercase(), identity);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        failures.insert(name.to_lowercase(), err.to_string());
                    }
                }
            }
        }
        (by_name, failures)
    }

    fn forward_one(&self, name: &str) -> Result<Option<PlayerIdentity>> {
        single_match(self.lookup.forward(&[name.to_string()]), name)
    }
}

/// A one-name lookup the service rejects outright means the name itself is invalid.
fn single_match(
    result: Result<Vec<PlayerIdentity>>,
    name: &str,
) -> Result<Option<PlayerIdentity>> {
    match result {
        Ok(found) => Ok(pick_by_name(found, name)),
        Err(StatsError::Status { status: 400 | 404, .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

fn pick_by_name(found: Vec<PlayerIdentity>, token: &str) -> Option<PlayerIdentity> {
    let wanted = token.to_lowercase();
    found
        .into_iter()
        .find(|identity| identity.display_name.to_lowercase() == wanted)
}

fn warning_line(token: &str, err: &StatsError) -> String {
    match err {
        StatsError::UnknownIdentifier(_) | StatsError::UnknownUsername(_) => err.to_string(),
        other => format!("{token} could not be resolved: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingLookup {
        forward_calls: Mutex<Vec<Vec<String>>>,
        reverse_calls: Mutex<Vec<String>>,
    }

    impl IdentityLookup for RecordingLookup {
        fn forward(&self, names: &[String]) -> Result<Vec<PlayerIdentity>> {
            self.forward_calls.lock().unwrap().push(names.to_vec());
            Ok(names
                .iter()
                .filter(|n| n.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
                .map(|n| PlayerIdentity {
                    canonical_id: format!("id-{n}"),
                    display_name: n.clone(),
                })
                .collect())
        }

        fn reverse(&self, id: &str) -> Result<Option<PlayerIdentity>> {
            self.reverse_calls.lock().unwrap().push(id.to_string());
            Ok(None)
        }
    }

    #[test]
    fn sixteen_chars_is_a_username() {
        let lookup = RecordingLookup::default();
        let resolver = Resolver::new(&lookup, &StatsConfig::default());
        let token = "abcdefghijklmnop";
        assert_eq!(token.len(), 16);
        let identity = resolver.resolve(token).unwrap();
        assert_eq!(identity.canonical_id, "id-abcdefghijklmnop");
        assert!(lookup.reverse_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn seventeen_chars_goes_through_reverse_lookup() {
        let lookup = RecordingLookup::default();
        let resolver = Resolver::new(&lookup, &StatsConfig::default());
        let err = resolver.resolve("abcdefghijklmnopq").unwrap_err();
        assert!(matches!(err, StatsError::UnknownIdentifier(_)));
        assert_eq!(lookup.reverse_calls.lock().unwrap().len(), 1);
        assert!(lookup.forward_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn pick_by_name_needs_a_matching_record() {
        let found = vec![
            PlayerIdentity {
                canonical_id: "1".to_string(),
                display_name: "Other".to_string(),
            },
            PlayerIdentity {
                canonical_id: "2".to_string(),
                display_name: "Notch".to_string(),
            },
        ];
        assert_eq!(pick_by_name(found.clone(), "notch").unwrap().canonical_id, "2");
        assert!(pick_by_name(found, "jeb_").is_none());
    }

    /// Rejects the whole request when any name in it is malformed, the way the
    /// profiles endpoint answers 400 for a bad body.
    #[derive(Default)]
    struct StrictLookup {
        forward_calls: Mutex<Vec<Vec<String>>>,
        down: bool,
    }

    impl IdentityLookup for StrictLookup {
        fn forward(&self, names: &[String]) -> Result<Vec<PlayerIdentity>> {
            self.forward_calls.lock().unwrap().push(names.to_vec());
            if self.down {
                return Err(StatsError::Status {
                    url: "fake://profiles".to_string(),
                    status: 503,
                });
            }
            let valid = |n: &String| n.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !names.iter().all(valid) {
                return Err(StatsError::Status {
                    url: "fake://profiles".to_string(),
                    status: 400,
                });
            }
            Ok(names
                .iter()
                .map(|n| PlayerIdentity {
                    canonical_id: format!("id-{n}"),
                    display_name: n.clone(),
                })
                .collect())
        }

        fn reverse(&self, _id: &str) -> Result<Option<PlayerIdentity>> {
            Ok(None)
        }
    }

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn bad_name_does_not_sink_its_batch() {
        let lookup = StrictLookup::default();
        let resolver = Resolver::new(&lookup, &StatsConfig::default());
        let out = resolver.resolve_all(&tokens(&["validplayer", "###badtoken###"]));

        let names: Vec<&str> = out.players.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, vec!["validplayer"]);
        assert_eq!(
            out.warnings,
            vec!["###badtoken### is not a valid Minecraft username."]
        );
    }

    #[test]
    fn later_batches_are_still_queried_after_a_rejected_one() {
        let lookup = StrictLookup::default();
        let resolver = Resolver::new(&lookup, &StatsConfig::default());
        let mut raw: Vec<String> = (0..9).map(|i| format!("player{i}")).collect();
        raw.insert(3, "bad!name".to_string());
        raw.push("goodlater".to_string());
        assert_eq!(raw.len(), 11);

        let out = resolver.resolve_all(&raw);
        assert_eq!(out.players.len(), 10);
        assert_eq!(out.players[3].display_name, "player3");
        assert_eq!(out.players[9].display_name, "goodlater");
        assert_eq!(out.warnings, vec!["bad!name is not a valid Minecraft username."]);

        let calls = lookup.forward_calls.lock().unwrap();
        assert_eq!(calls[0].len(), 10);
        assert!(calls.iter().skip(1).all(|call| call.len() == 1));
        assert_eq!(calls.last().unwrap(), &vec!["goodlater".to_string()]);
        assert_eq!(calls.len(), 1 + 10 + 1);
    }

    #[test]
    fn service_outage_warns_per_name() {
        let lookup = StrictLookup {
            down: true,
            ..StrictLookup::default()
        };
        let resolver = Resolver::new(&lookup, &StatsConfig::default());
        let out = resolver.resolve_all(&tokens(&["alpha"]));
        assert!(out.players.is_empty());
        assert_eq!(
            out.warnings,
            vec!["alpha could not be resolved: http 503 from fake://profiles"]
        );
        assert_eq!(lookup.forward_calls.lock().unwrap().len(), 1);
    }
}
