#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use guildtune::{
    error::{ResolveError, ResolveResult, SinkError, SinkResult, StoreError, StoreResult},
    events::EventHandler,
    model::{QueueSnapshot, TrackRef, TrackSearch},
    player::MusicPlayer,
    resolver::{CatalogResolution, CatalogService, MediaResolver, Resolution},
    sink::{AudioSink, TrackEndHandle},
    store::QueueStore,
    types::{ChannelId, GuildId},
};

pub fn track(name: &str) -> TrackRef {
    TrackRef::new(format!("https://youtu.be/{}", name), name).duration(180)
}

pub fn titles<'a>(tracks: impl IntoIterator<Item = &'a TrackRef>) -> Vec<String> {
    tracks.into_iter().map(|t| t.title.clone()).collect()
}

#[derive(Default)]
struct SinkState {
    connected: Option<ChannelId>,
    playing: bool,
    paused: bool,
    handle: Option<TrackEndHandle>,
    played: Vec<String>,
    stops: usize,
    disconnects: usize,
    failing: HashSet<String>,
    complete_on_stop: bool,
}

/// Records every call and only ends a stream when the test says so.
#[derive(Default)]
pub struct FakeSink {
    state: Mutex<SinkState>,
}

impl FakeSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_on(&self, locator: &str) {
        self.state.lock().failing.insert(locator.to_string());
    }

    /// Makes `stop` resolve the running stream's handle before returning.
    pub fn complete_on_stop(&self) {
        self.state.lock().complete_on_stop = true;
    }

    pub fn played(&self) -> Vec<String> {
        self.state.lock().played.clone()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().stops
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.state.lock().connected
    }

    /// Takes the pending completion handle without resolving it.
    pub fn take_handle(&self) -> Option<TrackEndHandle> {
        let mut state = self.state.lock();
        state.playing = false;
        state.paused = false;
        state.handle.take()
    }

    /// The current stream runs out.
    pub async fn finish(&self) {
        let handle = self.take_handle().expect("no stream is running");
        handle.finished().await;
    }
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn connect(&self, channel: ChannelId) -> SinkResult<()> {
        self.state.lock().connected = Some(channel);
        Ok(())
    }

    async fn play(&self, locator: &str, on_finished: TrackEndHandle) -> SinkResult<()> {
        let mut state = self.state.lock();

        if state.failing.contains(locator) {
            return Err(SinkError::Start(format!("cannot open {}", locator)));
        }

        state.played.push(locator.to_string());
        state.playing = true;
        state.paused = false;
        state.handle = Some(on_finished);

        Ok(())
    }

    async fn stop(&self) {
        let pending = {
            let mut state = self.state.lock();
            state.stops += 1;
            state.playing = false;
            state.paused = false;

            if state.complete_on_stop {
                state.handle.take()
            } else {
                None
            }
        };

        if let Some(handle) = pending {
            handle.finished().await;
        }
    }

    async fn pause(&self) {
        let mut state = self.state.lock();
        state.playing = false;
        state.paused = true;
    }

    async fn resume(&self) {
        let mut state = self.state.lock();
        state.playing = true;
        state.paused = false;
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    async fn disconnect(&self) {
        let mut state = self.state.lock();
        state.connected = None;
        state.disconnects += 1;
    }
}

/// Answers searches after `delay`, like a slow media server.
pub struct SlowResolver {
    pub delay: Duration,
}

#[async_trait]
impl MediaResolver for SlowResolver {
    async fn resolve(&self, search: &TrackSearch) -> ResolveResult<Resolution> {
        tokio::time::sleep(self.delay).await;

        Ok(Resolution::Track(TrackRef::new(search.to_string(), search.to_string())))
    }
}

/// Resolves searches to `search:<query>` tracks and urls to whatever was registered.
#[derive(Default)]
pub struct FakeResolver {
    known: Mutex<HashMap<String, Resolution>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, url: &str, resolution: Resolution) {
        self.known.lock().insert(url.to_string(), resolution);
    }

    pub fn fail_on(&self, query: &str) {
        self.failing.lock().insert(query.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaResolver for FakeResolver {
    async fn resolve(&self, search: &TrackSearch) -> ResolveResult<Resolution> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match search {
            TrackSearch::Youtube(query) => {
                if self.failing.lock().contains(query) {
                    return Err(ResolveError::NoMatches(query.clone()));
                }

                Ok(Resolution::Track(TrackRef::new(format!("search:{}", query), query.clone())))
            },
            TrackSearch::Url(url) => self
                .known
                .lock()
                .get(url)
                .cloned()
                .ok_or_else(|| ResolveError::LoadFailed(format!("unknown url {}", url))),
        }
    }
}

pub struct FakeCatalog(pub CatalogResolution);

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn resolve_playlist_or_track(&self, _reference: &str) -> ResolveResult<CatalogResolution> {
        Ok(self.0.clone())
    }
}

/// Store whose writes always fail.
pub struct BrokenStore;

#[async_trait]
impl QueueStore for BrokenStore {
    async fn load(&self, _guild_id: GuildId) -> StoreResult<Option<QueueSnapshot>> {
        Ok(None)
    }

    async fn save(&self, _guild_id: GuildId, _snapshot: &QueueSnapshot) -> StoreResult<()> {
        Err(StoreError::Corrupt("disk on fire".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Started(String),
    Failed(String),
    Finished,
    Ingested { added: usize, total: usize },
}

pub struct RecordingHandler {
    sender: UnboundedSender<Recorded>,
}

impl RecordingHandler {
    pub fn new() -> (Self, UnboundedReceiver<Recorded>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn track_start(&self, _player: Arc<MusicPlayer>, track: TrackRef) {
        let _ = self.sender.send(Recorded::Started(track.title));
    }

    async fn track_failed(&self, _player: Arc<MusicPlayer>, track: TrackRef, _error: SinkError) {
        let _ = self.sender.send(Recorded::Failed(track.title));
    }

    async fn queue_finished(&self, _player: Arc<MusicPlayer>) {
        let _ = self.sender.send(Recorded::Finished);
    }

    async fn ingestion_finished(&self, _player: Arc<MusicPlayer>, added: usize, total: usize) {
        let _ = self.sender.send(Recorded::Ingested { added, total });
    }
}

/// Waits for the next event matching `wanted`, skipping others.
pub async fn wait_for<F>(events: &mut UnboundedReceiver<Recorded>, wanted: F) -> Recorded
where
    F: Fn(&Recorded) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Some(event) if wanted(&event) => return event,
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
