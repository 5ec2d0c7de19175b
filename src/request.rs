use std::sync::Arc;
use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, info_span, warn};
use tracing_futures::Instrument;
use crate::{
    error::{PlayerError, PlayerResult, ResolveError},
    model::{TrackRef, TrackSearch},
    player::{MusicPlayer, Session},
    resolver::{CatalogEntry, CatalogResolution, CatalogService, MediaResolver, Resolution},
    types::UserId,
};

lazy_static!(
    static ref CATALOG_URL: Regex = Regex::new(r"^https?://(?:open\.)?spotify\.com/").unwrap();
    static ref URL: Regex = Regex::new(r"^https?://\S+$").unwrap();
);

/// How a user supplied request is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// Catalog track or playlist link, resolved to media searches first.
    Catalog(String),
    /// Any other link, handed to the media resolver as is.
    Media(String),
    /// Free text, searched on the media side.
    Search(String),
}

impl RequestKind {
    pub fn classify(input: &str) -> Option<Self> {
        let input = input.trim();

        if input.is_empty() {
            None
        } else if CATALOG_URL.is_match(input) {
            Some(RequestKind::Catalog(input.to_string()))
        } else if URL.is_match(input) {
            Some(RequestKind::Media(input.to_string()))
        } else {
            Some(RequestKind::Search(input.to_string()))
        }
    }
}

/// What a request added to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// One track, from a link, a search or a single catalog entry.
    Track {
        title: String,
    },
    /// A playlist that was queued in one go.
    Playlist {
        name: Option<String>,
        added: usize,
    },
    /// A catalog playlist: the first batch is queued, `pending` entries are
    /// still being resolved in the background.
    CatalogPlaylist {
        total: usize,
        added: usize,
        pending: usize,
    },
}

/// Outcome of [`RequestHandler::handle`].
#[derive(Debug, Clone)]
pub struct Handled {
    pub outcome: RequestOutcome,
    /// Track that started because the player was idle.
    pub started: Option<TrackRef>,
}

/// Resolves requests and feeds them to a guild's player.
#[derive(Clone)]
pub struct RequestHandler {
    resolver: Arc<dyn MediaResolver>,
    catalog: Option<Arc<dyn CatalogService>>,
}

impl RequestHandler {
    pub fn new<R: MediaResolver>(resolver: R) -> Self {
        Self {
            resolver: Arc::new(resolver),
            catalog: None,
        }
    }

    pub fn from_shared(resolver: Arc<dyn MediaResolver>, catalog: Option<Arc<dyn CatalogService>>) -> Self {
        Self { resolver, catalog }
    }

    pub fn with_catalog<C: CatalogService>(mut self, catalog: C) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    /// Resolves `input`, queues the result and starts playback when idle.
    ///
    /// Resolution errors leave the queue untouched. Catalog playlists start
    /// playing after their first batch; the rest is queued by a background
    /// task. A `stop`/`leave` while the request is in flight drops it with
    /// [`PlayerError::Cancelled`].
    pub async fn handle(&self, player: &Arc<MusicPlayer>, input: &str, requester: Option<UserId>) -> PlayerResult<Handled> {
        self.run(player, input, requester, false).await
    }

    /// [`handle`](Self::handle), turning queue loop on with the whole queue
    /// as the loop snapshot once the request's first tracks are queued.
    ///
    /// Catalog tracks ingested later are appended to the snapshot as well.
    pub async fn handle_looped(&self, player: &Arc<MusicPlayer>, input: &str, requester: Option<UserId>) -> PlayerResult<Handled> {
        self.run(player, input, requester, true).await
    }

    async fn run(&self, player: &Arc<MusicPlayer>, input: &str, requester: Option<UserId>, looped: bool) -> PlayerResult<Handled> {
        let kind = RequestKind::classify(input)
            .ok_or_else(|| ResolveError::Unsupported("empty request".to_string()))?;

        let session = player.session().await;

        let outcome = match kind {
            RequestKind::Catalog(reference) => {
                return self.handle_catalog(player, session, &reference, requester, looped).await
            },
            RequestKind::Media(url) => {
                self.queue_media(player, session, TrackSearch::Url(url), requester, looped).await?
            },
            RequestKind::Search(query) => {
                self.queue_media(player, session, TrackSearch::Youtube(query), requester, looped).await?
            },
        };

        let started = start(player, session).await?;

        Ok(Handled { outcome, started })
    }

    async fn queue_media(
        &self,
        player: &MusicPlayer,
        session: Session,
        search: TrackSearch,
        requester: Option<UserId>,
        looped: bool,
    ) -> PlayerResult<RequestOutcome> {
        match self.resolver.resolve(&search).await? {
            Resolution::Track(track) => {
                let title = track.title.clone();
                queue(player, session, vec![track], requester, looped).await?;

                Ok(RequestOutcome::Track { title })
            },
            Resolution::Playlist { name, tracks } => {
                if tracks.is_empty() {
                    return Err(ResolveError::EmptyPlaylist.into());
                }

                let added = queue(player, session, tracks, requester, looped).await?;

                Ok(RequestOutcome::Playlist { name, added })
            }
        }
    }

    async fn handle_catalog(
        &self,
        player: &Arc<MusicPlayer>,
        session: Session,
        reference: &str,
        requester: Option<UserId>,
        looped: bool,
    ) -> PlayerResult<Handled> {
        let catalog = self
            .catalog
            .as_ref()
            .ok_or_else(|| ResolveError::Unsupported("no catalog service is configured".to_string()))?;

        match catalog.resolve_playlist_or_track(reference).await? {
            CatalogResolution::Track(entry) => {
                let track = self
                    .resolver
                    .resolve(&entry.search())
                    .await?
                    .into_first()
                    .ok_or_else(|| ResolveError::NoMatches(entry.query.clone()))?;

                queue(player, session, vec![track], requester, looped).await?;
                let started = start(player, session).await?;

                Ok(Handled {
                    outcome: RequestOutcome::Track { title: entry.display_name },
                    started,
                })
            },
            CatalogResolution::Playlist(entries) => {
                if entries.is_empty() {
                    return Err(ResolveError::EmptyPlaylist.into());
                }

                let total = entries.len();
                let batch_size = player.config().ingest_batch_size.max(1);
                let split = batch_size.min(total);
                let rest = entries[split..].to_vec();

                let tracks = resolve_batch(&self.resolver, &entries[..split]).await;
                let added = queue(player, session, tracks, requester, looped).await?;
                let started = start(player, session).await?;

                info!("Queued first {} of {} catalog tracks on guild {}", added, total, player.guild_id());

                if rest.is_empty() {
                    player.ingestion_finished(added, total);
                } else {
                    self.spawn_ingestion(player, session, rest, requester, added, total);
                }

                Ok(Handled {
                    outcome: RequestOutcome::CatalogPlaylist {
                        total,
                        added,
                        pending: total - split,
                    },
                    started,
                })
            }
        }
    }

    fn spawn_ingestion(
        &self,
        player: &Arc<MusicPlayer>,
        session: Session,
        rest: Vec<CatalogEntry>,
        requester: Option<UserId>,
        mut added: usize,
        total: usize,
    ) {
        let resolver = Arc::clone(&self.resolver);
        let task_player = Arc::clone(player);
        let batch_size = player.config().ingest_batch_size.max(1);
        let span = info_span!("ingestion", guild_id = player.guild_id());

        let task = tokio::spawn(async move {
            for batch in rest.chunks(batch_size) {
                let tracks = resolve_batch(&resolver, batch).await;

                if tracks.is_empty() {
                    continue;
                }

                match task_player.enqueue_in(session, tracks, requester).await {
                    Ok(count) => added += count,
                    Err(_) => {
                        info!("Player was stopped, dropping the rest of the playlist");
                        return;
                    }
                }

                if let Err(why) = task_player.start_if_idle_in(session).await {
                    warn!("Error starting playback during ingestion: {}", why);
                }
            }

            info!("Finished ingestion, added {}/{} tracks", added, total);
            task_player.ingestion_finished(added, total);
        }.instrument(span));

        player.track_ingestion(task.abort_handle());
    }
}

/// Resolves one batch concurrently, keeping playlist order and skipping misses.
async fn resolve_batch(resolver: &Arc<dyn MediaResolver>, batch: &[CatalogEntry]) -> Vec<TrackRef> {
    let searches: Vec<TrackSearch> = batch.iter().map(CatalogEntry::search).collect();
    let results = join_all(searches.iter().map(|search| resolver.resolve(search))).await;

    batch
        .iter()
        .zip(results)
        .filter_map(|(entry, result)| match result {
            Ok(resolution) => resolution.into_first(),
            Err(why) => {
                warn!("Error adding track {}: {}", entry.display_name, why);
                None
            }
        })
        .collect()
}

async fn queue(player: &MusicPlayer, session: Session, tracks: Vec<TrackRef>, requester: Option<UserId>, looped: bool) -> PlayerResult<usize> {
    if looped {
        player.enqueue_looped_in(session, tracks, requester).await
    } else {
        player.enqueue_in(session, tracks, requester).await
    }
}

async fn start(player: &MusicPlayer, session: Session) -> PlayerResult<Option<TrackRef>> {
    match player.start_if_idle_in(session).await {
        Ok(outcome) => Ok(outcome.and_then(|outcome| outcome.started)),
        Err(PlayerError::NotConnected) => Ok(None),
        Err(why) => Err(why),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_requests() {
        assert_eq!(
            RequestKind::classify("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=1"),
            Some(RequestKind::Catalog("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=1".to_string()))
        );
        assert_eq!(
            RequestKind::classify(" https://youtube.com/playlist?list=PLn79jv6mDuar0LS9n6o6JH6ZA5unZZ3x7 "),
            Some(RequestKind::Media("https://youtube.com/playlist?list=PLn79jv6mDuar0LS9n6o6JH6ZA5unZZ3x7".to_string()))
        );
        assert_eq!(
            RequestKind::classify("world is mine"),
            Some(RequestKind::Search("world is mine".to_string()))
        );
        assert_eq!(RequestKind::classify("   "), None);
    }
}
