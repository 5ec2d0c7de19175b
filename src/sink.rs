use std::sync::Weak;
use async_trait::async_trait;
use tokio::runtime::Handle;
use tracing::{debug, info_span, warn};
use tracing_futures::Instrument;
use crate::{
    error::SinkResult,
    player::MusicPlayer,
    types::ChannelId,
};

/// The component that owns the actual audio stream to a voice channel.
///
/// `play`, `pause`, `resume` and `connect` run while the guild is locked, so
/// they must never await a [`TrackEndHandle`]. `stop` and `disconnect` run
/// unlocked and may resolve the handle inline.
#[async_trait]
pub trait AudioSink: Send + Sync + 'static {
    /// Joins, or moves to, the given voice channel.
    async fn connect(&self, channel: ChannelId) -> SinkResult<()>;
    /// Starts streaming `locator`. `on_finished` must be resolved exactly once
    /// when that stream ends, whether it ran out or was stopped.
    async fn play(&self, locator: &str, on_finished: TrackEndHandle) -> SinkResult<()>;
    async fn stop(&self);
    async fn pause(&self);
    async fn resume(&self);
    fn is_playing(&self) -> bool;
    fn is_paused(&self) -> bool;
    async fn disconnect(&self);
}

/// Continuation handed to the sink with every stream it starts.
///
/// Resolving it re-enters the owning player under its guild lock. Handles of
/// streams that were stopped explicitly, or superseded, are ignored. A handle
/// dropped without being resolved reports the end of its stream on its own.
pub struct TrackEndHandle {
    player: Weak<MusicPlayer>,
    stream_id: u64,
    runtime: Option<Handle>,
    resolved: bool,
}

impl TrackEndHandle {
    pub(crate) fn new(player: Weak<MusicPlayer>, stream_id: u64) -> Self {
        Self {
            player,
            stream_id,
            runtime: Handle::try_current().ok(),
            resolved: false,
        }
    }

    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Signals the end of the stream and waits for the player to advance.
    pub async fn finished(mut self) {
        self.resolved = true;

        match self.player.upgrade() {
            Some(player) => player.on_track_end(self.stream_id).await,
            None => debug!("Stream {} finished after its player was dropped", self.stream_id),
        }
    }

    /// Same as [`finished`](Self::finished), for sinks that report completion
    /// from a non-async context. The advance runs on the runtime the stream
    /// was started from.
    pub fn finished_detached(mut self) {
        self.report();
    }

    fn report(&mut self) {
        self.resolved = true;

        let player = match self.player.upgrade() {
            Some(player) => player,
            None => return,
        };

        let runtime = match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => runtime,
            None => {
                warn!("No runtime available to report the end of stream {}", self.stream_id);
                player.abandon_stream(self.stream_id);
                return;
            }
        };

        let stream_id = self.stream_id;
        let span = info_span!("track_end", stream_id);

        runtime.spawn(async move {
            player.on_track_end(stream_id).await;
        }.instrument(span));
    }
}

impl Drop for TrackEndHandle {
    fn drop(&mut self) {
        if !self.resolved {
            debug!("Stream {} handle dropped without being resolved", self.stream_id);
            self.report();
        }
    }
}

impl std::fmt::Debug for TrackEndHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackEndHandle")
            .field("stream_id", &self.stream_id)
            .finish()
    }
}
