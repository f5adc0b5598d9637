use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::unsync::OnceCell;
use rayon::prelude::*;
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::StatsConfig;
use crate::error::{Result, StatsError};
use crate::http_client::build_http_client;
use crate::resolver::PlayerIdentity;

/// Anything that hands back a raw stat page for a player id.
pub trait StatPageSource: Sync {
    fn fetch(&self, id: &str) -> Result<String>;
}

/// GET `{base}/{id}` and return the body as text.
pub struct PageSource {
    client: Client,
    base_url: String,
}

impl PageSource {
    pub fn new(config: &StatsConfig, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn plancke(config: &StatsConfig) -> Result<Self> {
        Self::new(config, &config.plancke_url)
    }
}

impl StatPageSource for PageSource {
    fn fetch(&self, id: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, id);
        let resp = self.client.get(&url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StatsError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(resp.text()?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fetches every id concurrently and returns the pages in input order.
///
/// The pool gets one thread per id, up to `max_in_flight`, so a normal batch has
/// every request outstanding at once. A failed fetch degrades to `None` for that
/// slot. If `cancel` fires before the join completes, everything collected so far
/// is dropped.
pub fn fetch_documents<S: StatPageSource + ?Sized>(
    source: &S,
    ids: &[String],
    max_in_flight: usize,
    cancel: &CancelToken,
) -> Result<Vec<Option<String>>> {
    let threads = ids.len().clamp(1, max_in_flight.max(1));
    let pages: Vec<Option<String>> = with_fetch_pool(threads, || {
        ids.par_iter()
            .map(|id| {
                if cancel.is_cancelled() {
                    return None;
                }
                match source.fetch(id) {
                    Ok(page) => {
                        debug!(id = %id, bytes = page.len(), "fetched stat page");
                        Some(page)
                    }
                    Err(err) => {
                        warn!(id = %id, error = %err, "stat page fetch failed");
                        None
                    }
                }
            })
            .collect()
    });

    if cancel.is_cancelled() {
        return Err(StatsError::Cancelled);
    }
    Ok(pages)
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
    {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

/// A resolved player plus its stat page, fetched at most once per invocation.
#[derive(Debug)]
pub struct StatPlayer {
    pub identity: PlayerIdentity,
    page: OnceCell<Option<String>>,
}

impl StatPlayer {
    pub fn new(identity: PlayerIdentity) -> Self {
        Self {
            identity,
            page: OnceCell::new(),
        }
    }

    /// Seeds the page from a batch fetch so `page` never goes back to the network.
    pub fn with_page(identity: PlayerIdentity, page: Option<String>) -> Self {
        Self {
            identity,
            page: OnceCell::with_value(page),
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.display_name
    }

    pub fn page<S: StatPageSource + ?Sized>(&self, source: &S) -> Option<&str> {
        self.page
            .get_or_init(|| match source.fetch(&self.identity.canonical_id) {
                Ok(page) => Some(page),
                Err(err) => {
                    warn!(id = %self.identity.canonical_id, error = %err, "stat page fetch failed");
                    None
                }
            })
            .as_deref()
    }

    pub fn cached_page(&self) -> Option<&str> {
        self.page.get().and_then(|page| page.as_deref())
    }
}

/// Resolved identities in, players with their pages pre-seeded out.
pub fn fetch_players<S: StatPageSource + ?Sized>(
    source: &S,
    identities: Vec<PlayerIdentity>,
    max_in_flight: usize,
    cancel: &CancelToken,
) -> Result<Vec<StatPlayer>> {
    let ids: Vec<String> = identities
        .iter()
        .map(|identity| identity.canonical_id.clone())
        .collect();
    let pages = fetch_documents(source, &ids, max_in_flight, cancel)?;
    Ok(identities
        .into_iter()
        .zip(pages)
        .map(|(identity, page)| StatPlayer::with_page(identity, page))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl StatPageSource for CountingSource {
        fn fetch(&self, id: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("<p>{id}</p>"))
        }
    }

    #[test]
    fn player_page_is_fetched_once() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };
        let player = StatPlayer::new(PlayerIdentity {
            canonical_id: "abc".to_string(),
            display_name: "Abc".to_string(),
        });
        assert_eq!(player.page(&source), Some("<p>abc</p>"));
        assert_eq!(player.page(&source), Some("<p>abc</p>"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn seeded_page_skips_network() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };
        let player = StatPlayer::with_page(
            PlayerIdentity {
                canonical_id: "abc".to_string(),
                display_name: "Abc".to_string(),
            },
            None,
        );
        assert_eq!(player.page(&source), None);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
