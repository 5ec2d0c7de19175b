use async_trait::async_trait;
use crate::{
    error::ResolveResult,
    model::{TrackRef, TrackSearch},
};

/// What a media reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Track(TrackRef),
    Playlist {
        name: Option<String>,
        tracks: Vec<TrackRef>,
    },
}

impl Resolution {
    /// Tracks in the order the resolver returned them.
    pub fn into_tracks(self) -> Vec<TrackRef> {
        match self {
            Resolution::Track(track) => vec![track],
            Resolution::Playlist { tracks, .. } => tracks,
        }
    }

    /// First track only, searches and single catalog entries use this.
    pub fn into_first(self) -> Option<TrackRef> {
        self.into_tracks().into_iter().next()
    }

    pub fn len(&self) -> usize {
        match self {
            Resolution::Track(_) => 1,
            Resolution::Playlist { tracks, .. } => tracks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Turns urls and search strings into playable tracks.
#[async_trait]
pub trait MediaResolver: Send + Sync + 'static {
    async fn resolve(&self, search: &TrackSearch) -> ResolveResult<Resolution>;
}

/// One catalog track, to be searched for on the media side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Search terms, without any search prefix.
    pub query: String,
    pub display_name: String,
}

impl CatalogEntry {
    pub fn new(artist: &str, title: &str) -> Self {
        Self {
            query: format!("{} {}", artist, title),
            display_name: format!("{} - {}", artist, title),
        }
    }

    pub fn search(&self) -> TrackSearch {
        TrackSearch::Youtube(self.query.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResolution {
    Track(CatalogEntry),
    Playlist(Vec<CatalogEntry>),
}

/// Third party catalog (e.g. Spotify) that maps its own track and playlist
/// links to media searches.
#[async_trait]
pub trait CatalogService: Send + Sync + 'static {
    async fn resolve_playlist_or_track(&self, reference: &str) -> ResolveResult<CatalogResolution>;
}
