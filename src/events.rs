use async_trait::async_trait;
use tracing::info_span;
use tracing_futures::Instrument;

use crate::{
    error::SinkError,
    model::TrackRef,
    player::MusicPlayer,
};
use std::sync::Arc;

#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Event that triggers when a track starts playing.
    async fn track_start(&self, _player: Arc<MusicPlayer>, _track: TrackRef) {}
    /// Event that triggers when the audio sink refused to start a track, the track is skipped.
    async fn track_failed(&self, _player: Arc<MusicPlayer>, _track: TrackRef, _error: SinkError) {}
    /// Event that triggers when the queue ran dry and the player went idle.
    async fn queue_finished(&self, _player: Arc<MusicPlayer>) {}
    /// Event triggered when a background playlist ingestion completes.
    async fn ingestion_finished(&self, _player: Arc<MusicPlayer>, _added: usize, _total: usize) {}
}

/// Handler that ignores every event.
pub struct DefaultHandler;

impl EventHandler for DefaultHandler {}

pub(crate) fn process(player: Arc<MusicPlayer>, handler: Arc<dyn EventHandler>, event_type: EventType) {
    let span = info_span!("event", guild_id = player.guild_id());

    match event_type {
        EventType::TrackStart(track) => {
            tokio::spawn(async move {
                handler.track_start(player, track).await;
            }.instrument(span));
        },
        EventType::TrackFailed(track, why) => {
            tokio::spawn(async move {
                handler.track_failed(player, track, why).await;
            }.instrument(span));
        },
        EventType::QueueFinished => {
            tokio::spawn(async move {
                handler.queue_finished(player).await;
            }.instrument(span));
        },
        EventType::IngestionFinished { added, total } => {
            tokio::spawn(async move {
                handler.ingestion_finished(player, added, total).await;
            }.instrument(span));
        }
    }
}

pub(crate) enum EventType {
    TrackStart(TrackRef),
    TrackFailed(TrackRef, SinkError),
    QueueFinished,
    IngestionFinished { added: usize, total: usize },
}
