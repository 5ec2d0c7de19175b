use async_trait::async_trait;
use reqwest::{Client as HttpClient, header::{HeaderMap, HeaderValue}};
use tracing::{debug, warn};
use crate::{
    builder::NodeBuilder,
    error::{ResolveError, ResolveResult},
    model::{lavalink::Tracks, TrackRef, TrackSearch},
    resolver::{MediaResolver, Resolution},
};

/// [`MediaResolver`] backed by the `/loadtracks` endpoint of a Lavalink or
/// Andesite node. Resolved locators are the node's encoded track strings.
pub struct LavalinkResolver {
    http: HttpClient,
    rest_url: String,
}

impl LavalinkResolver {
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    pub(crate) fn new(builder: NodeBuilder) -> ResolveResult<Self> {
        let mut headers = HeaderMap::new();
        let password = HeaderValue::from_str(&builder.pass)
            .map_err(|why| ResolveError::Config(format!("invalid node password: {}", why)))?;
        headers.insert("Authorization", password);

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            rest_url: builder.rest_url(),
        })
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    pub async fn get_tracks<Q: ToString>(&self, query: Q) -> ResolveResult<Tracks> {
        let identifier = query.to_string();

        debug!("Loading tracks for `{}`", identifier);

        let response = self.http.get(&format!("{}/loadtracks", self.rest_url))
            .query(&[("identifier", identifier.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json::<Tracks>()
            .await?;

        Ok(response)
    }

    pub async fn auto_search<Q: ToString>(&self, query: Q) -> ResolveResult<Tracks> {
        self.get_tracks(TrackSearch::auto(query)).await
    }
}

#[async_trait]
impl MediaResolver for LavalinkResolver {
    async fn resolve(&self, search: &TrackSearch) -> ResolveResult<Resolution> {
        let tracks = self.get_tracks(search).await?;

        interpret(&search.to_string(), tracks)
    }
}

pub(crate) fn interpret(identifier: &str, tracks: Tracks) -> ResolveResult<Resolution> {
    match tracks.load_type.as_str() {
        "TRACK_LOADED" | "SEARCH_RESULT" => tracks
            .tracks
            .into_iter()
            .next()
            .map(|track| Resolution::Track(track.into()))
            .ok_or_else(|| ResolveError::NoMatches(identifier.to_string())),
        "PLAYLIST_LOADED" => {
            let list: Vec<TrackRef> = tracks.tracks.into_iter().map(TrackRef::from).collect();

            if list.is_empty() {
                return Err(ResolveError::EmptyPlaylist);
            }

            Ok(Resolution::Playlist {
                name: tracks.playlist_info.name,
                tracks: list,
            })
        },
        "NO_MATCHES" => Err(ResolveError::NoMatches(identifier.to_string())),
        "LOAD_FAILED" => Err(ResolveError::LoadFailed(
            tracks
                .exception
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown error".to_string()),
        )),
        other => {
            warn!("Unknown load type `{}` for `{}`", other, identifier);

            Err(ResolveError::LoadFailed(format!("unknown load type `{}`", other)))
        }
    }
}
