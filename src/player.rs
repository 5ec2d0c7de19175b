use std::{
    cmp::max,
    sync::{Arc, Weak},
};
use parking_lot::Mutex as SyncMutex;
use tokio::{sync::Mutex, task::AbortHandle};
use tracing::{debug, error, info, warn};
use crate::{
    error::{PlayerError, PlayerResult, SinkError},
    events::{process, EventHandler, EventType},
    model::{QueuePage, QueueSnapshot, TrackRef},
    sink::{AudioSink, TrackEndHandle},
    state::{LoopMode, QueueState, Step},
    store::QueueStore,
    types::{ChannelId, GuildId, UserId},
};

/// Tunables shared by every player of a registry.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Tracks per queue page (default: 15).
    pub page_size: usize,
    /// Catalog queries resolved concurrently per ingestion batch (default: 5).
    pub ingest_batch_size: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            page_size: 15,
            ingest_batch_size: 5,
        }
    }
}

/// Result of a successful advance.
#[derive(Debug, Clone, Default)]
pub struct AdvanceOutcome {
    /// Track now streaming, `None` when the player went idle.
    pub started: Option<TrackRef>,
    /// Tracks skipped on the way because the sink refused them.
    pub skipped: Vec<(TrackRef, SinkError)>,
}

/// Marks the work a caller started between two stops of a player.
///
/// Obtained from [`MusicPlayer::session`]. Every `stop`/`leave` opens a new
/// session, and the `*_in` operations refuse a session that is no longer
/// current with [`PlayerError::Cancelled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session(u64);

struct PlayerInner {
    state: QueueState,
    voice_connection: Option<Arc<dyn AudioSink>>,
    // Mirrors the sink, which stays the source of truth.
    is_paused: bool,
    active_stream: Option<u64>,
    stream_counter: u64,
    session: u64,
}

impl PlayerInner {
    fn new() -> Self {
        Self {
            state: QueueState::new(),
            voice_connection: None,
            is_paused: false,
            active_stream: None,
            stream_counter: 0,
            session: 0,
        }
    }

    fn next_stream_id(&mut self) -> u64 {
        self.stream_counter += 1;
        self.stream_counter
    }

    fn check(&self, session: Session) -> PlayerResult<()> {
        if self.session == session.0 {
            Ok(())
        } else {
            Err(PlayerError::Cancelled)
        }
    }
}

/// One guild's queue and playback.
///
/// Every operation takes the guild lock for its whole read-modify-write, so
/// commands and completion callbacks of one guild never interleave. Every
/// mutation is persisted before the lock is released; a failed save is
/// logged and the in-memory state stays authoritative.
pub struct MusicPlayer {
    guild_id: GuildId,
    inner: Mutex<PlayerInner>,
    store: Arc<dyn QueueStore>,
    event_handler: Arc<dyn EventHandler>,
    config: PlayerConfig,
    ingestions: SyncMutex<Vec<AbortHandle>>,
    self_ref: Weak<MusicPlayer>,
}

impl MusicPlayer {
    pub fn new(
        guild_id: GuildId,
        store: Arc<dyn QueueStore>,
        event_handler: Arc<dyn EventHandler>,
        config: PlayerConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            guild_id,
            inner: Mutex::new(PlayerInner::new()),
            store,
            event_handler,
            config,
            ingestions: SyncMutex::new(Vec::new()),
            self_ref: self_ref.clone(),
        })
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Replaces the in-memory state with the persisted one, if any.
    ///
    /// Returns whether a snapshot was found.
    pub async fn load(&self) -> PlayerResult<bool> {
        let snapshot = self.store.load(self.guild_id).await?;
        let mut inner = self.inner.lock().await;

        match snapshot {
            Some(snapshot) => {
                info!(
                    "Restored queue of guild {} ({} queued, {} in loop snapshot)",
                    self.guild_id,
                    snapshot.queue.len(),
                    snapshot.original_queue.len()
                );
                inner.state = QueueState::from_snapshot(snapshot);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Runs `f` against the current state without mutating it.
    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&QueueState) -> R,
    {
        let inner = self.inner.lock().await;

        f(&inner.state)
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        self.read(QueueState::snapshot).await
    }

    pub async fn current(&self) -> Option<TrackRef> {
        self.read(|state| state.current().cloned()).await
    }

    pub async fn queue_len(&self) -> usize {
        self.read(QueueState::len).await
    }

    pub async fn loop_mode(&self) -> LoopMode {
        self.read(QueueState::loop_mode).await
    }

    pub async fn is_paused(&self) -> bool {
        self.inner.lock().await.is_paused
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.voice_connection.is_some()
    }

    pub async fn session(&self) -> Session {
        Session(self.inner.lock().await.session)
    }

    /// Appends tracks to the queue and returns how many were added.
    ///
    /// Never starts playback on its own, see [`start_if_idle`](Self::start_if_idle).
    pub async fn enqueue<I>(&self, tracks: I, requester: Option<UserId>) -> usize
    where
        I: IntoIterator<Item = TrackRef>,
    {
        let mut inner = self.inner.lock().await;

        self.enqueue_locked(&mut inner, tracks, requester).await
    }

    /// [`enqueue`](Self::enqueue), unless the player was stopped since `session` was taken.
    pub async fn enqueue_in<I>(&self, session: Session, tracks: I, requester: Option<UserId>) -> PlayerResult<usize>
    where
        I: IntoIterator<Item = TrackRef>,
    {
        let mut inner = self.inner.lock().await;
        inner.check(session)?;

        Ok(self.enqueue_locked(&mut inner, tracks, requester).await)
    }

    /// Appends tracks and loops the resulting queue in one step.
    ///
    /// The loop snapshot becomes the whole queue after the append, without
    /// the current track.
    pub async fn enqueue_looped_in<I>(&self, session: Session, tracks: I, requester: Option<UserId>) -> PlayerResult<usize>
    where
        I: IntoIterator<Item = TrackRef>,
    {
        let mut inner = self.inner.lock().await;
        inner.check(session)?;

        let count = inner.state.enqueue_looped(tracks, requester);

        info!("Queued {} track(s) on guild {} with queue loop", count, self.guild_id);
        self.persist(&inner.state).await;

        Ok(count)
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.state.clear();

        self.persist(&inner.state).await;
    }

    pub async fn shuffle(&self) -> PlayerResult<()> {
        let mut inner = self.inner.lock().await;
        inner.state.shuffle()?;

        self.persist(&inner.state).await;

        Ok(())
    }

    pub async fn set_loop_mode(&self, mode: LoopMode) {
        let mut inner = self.inner.lock().await;
        inner.state.set_loop_mode(mode);

        info!("Loop mode of guild {} set to {:?}", self.guild_id, mode);
        self.persist(&inner.state).await;
    }

    /// Returns whether song loop is enabled afterwards. Disables queue loop.
    pub async fn toggle_loop_song(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let enabled = inner.state.toggle_loop_song();

        info!("Song loop {} on guild {}", if enabled { "enabled" } else { "disabled" }, self.guild_id);
        self.persist(&inner.state).await;

        enabled
    }

    /// Returns whether queue loop is enabled afterwards. Disables song loop.
    pub async fn toggle_loop_queue(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let enabled = inner.state.toggle_loop_queue();

        info!("Queue loop {} on guild {}", if enabled { "enabled" } else { "disabled" }, self.guild_id);
        self.persist(&inner.state).await;

        enabled
    }

    pub async fn page(&self, page: usize, per_page: usize) -> QueuePage {
        self.read(|state| state.page(page, per_page)).await
    }

    /// Keeps `sink` as this guild's voice connection after joining `channel`.
    /// An existing connection is moved to `channel` instead and `sink` is dropped.
    pub async fn connect(&self, channel: ChannelId, sink: Arc<dyn AudioSink>) -> PlayerResult<()> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = &inner.voice_connection {
            existing.connect(channel).await?;
            info!("Moved guild {} to channel {}", self.guild_id, channel);

            return Ok(());
        }

        sink.connect(channel).await?;
        inner.voice_connection = Some(sink);
        info!("Guild {} connected to channel {}", self.guild_id, channel);

        Ok(())
    }

    /// Starts the next track.
    ///
    /// Tracks the sink refuses to start are skipped, at most as many times as
    /// there were tracks to choose from. If that runs the queue dry the
    /// player goes idle and the last start error is returned.
    pub async fn advance(&self) -> PlayerResult<AdvanceOutcome> {
        let mut inner = self.inner.lock().await;

        self.advance_locked(&mut inner).await
    }

    /// Advances only when connected, the sink is neither playing nor paused
    /// and there is something to play.
    pub async fn start_if_idle(&self) -> PlayerResult<Option<AdvanceOutcome>> {
        let mut inner = self.inner.lock().await;

        self.start_if_idle_locked(&mut inner).await
    }

    /// [`start_if_idle`](Self::start_if_idle), unless the player was stopped since `session` was taken.
    pub async fn start_if_idle_in(&self, session: Session) -> PlayerResult<Option<AdvanceOutcome>> {
        let mut inner = self.inner.lock().await;
        inner.check(session)?;

        self.start_if_idle_locked(&mut inner).await
    }

    async fn enqueue_locked<I>(&self, inner: &mut PlayerInner, tracks: I, requester: Option<UserId>) -> usize
    where
        I: IntoIterator<Item = TrackRef>,
    {
        let count = inner.state.enqueue(tracks, requester);

        debug!("Queued {} track(s) on guild {}", count, self.guild_id);
        self.persist(&inner.state).await;

        count
    }

    async fn start_if_idle_locked(&self, inner: &mut PlayerInner) -> PlayerResult<Option<AdvanceOutcome>> {
        let busy = match &inner.voice_connection {
            Some(sink) => sink.is_playing() || sink.is_paused(),
            None => return Ok(None),
        };

        if busy || inner.active_stream.is_some() || !inner.state.has_next() {
            return Ok(None);
        }

        self.advance_locked(inner).await.map(Some)
    }

    /// Stops the running stream; its completion callback advances the queue.
    ///
    /// Returns whether there was anything to skip.
    pub async fn skip(&self) -> bool {
        let sink = {
            let inner = self.inner.lock().await;

            match &inner.voice_connection {
                Some(sink) if sink.is_playing() || sink.is_paused() => Arc::clone(sink),
                _ => return false,
            }
        };

        // The sink may report the end of the stream from inside `stop`.
        sink.stop().await;

        true
    }

    pub async fn pause(&self) -> bool {
        let mut inner = self.inner.lock().await;

        let sink = match &inner.voice_connection {
            Some(sink) if sink.is_playing() => Arc::clone(sink),
            _ => return false,
        };

        sink.pause().await;
        inner.is_paused = true;

        true
    }

    pub async fn resume(&self) -> bool {
        let mut inner = self.inner.lock().await;

        let sink = match &inner.voice_connection {
            Some(sink) if sink.is_paused() => Arc::clone(sink),
            _ => return false,
        };

        sink.resume().await;
        inner.is_paused = false;

        true
    }

    /// Resets to an idle, empty player and halts the sink.
    ///
    /// The completion callback of the halted stream is ignored whenever it
    /// arrives. Background ingestion is cancelled, and requests still being
    /// resolved are dropped, see [`Session`].
    pub async fn stop(&self) {
        self.cancel_ingestions();

        let sink = {
            let mut inner = self.inner.lock().await;
            self.reset_locked(&mut inner).await;

            inner.voice_connection.clone()
        };

        if let Some(sink) = sink {
            halt(sink.as_ref()).await;
        }
    }

    /// [`stop`](Self::stop), then disconnects and drops the voice connection.
    pub async fn leave(&self) {
        self.cancel_ingestions();

        let sink = {
            let mut inner = self.inner.lock().await;
            self.reset_locked(&mut inner).await;

            inner.voice_connection.take()
        };

        if let Some(sink) = sink {
            halt(sink.as_ref()).await;
            sink.disconnect().await;

            info!("Guild {} left its voice channel", self.guild_id);
        }
    }

    async fn reset_locked(&self, inner: &mut PlayerInner) {
        inner.active_stream = None;
        inner.session += 1;

        inner.state.reset();
        inner.is_paused = false;

        self.persist(&inner.state).await;
    }

    async fn advance_locked(&self, inner: &mut PlayerInner) -> PlayerResult<AdvanceOutcome> {
        let sink = match &inner.voice_connection {
            Some(sink) => Arc::clone(sink),
            None => return Err(PlayerError::NotConnected),
        };

        let replay = inner.state.loop_song() && inner.state.current().is_some();
        let budget = max(max(inner.state.len(), inner.state.original_queue().len()), 1) + usize::from(replay);
        let mut skipped: Vec<(TrackRef, SinkError)> = Vec::new();
        let mut allow_replay = true;

        loop {
            let step = match inner.state.next_step(allow_replay) {
                Some(step) => step,
                None => {
                    inner.active_stream = None;
                    inner.is_paused = false;
                    self.persist(&inner.state).await;

                    info!("Queue of guild {} finished", self.guild_id);
                    self.emit(EventType::QueueFinished);

                    return match skipped.pop() {
                        Some((_, last)) => Err(PlayerError::PlaybackStart {
                            attempts: skipped.len() + 1,
                            last,
                        }),
                        None => Ok(AdvanceOutcome::default()),
                    };
                }
            };

            if let Step::Next(_) = step {
                self.persist(&inner.state).await;
            }

            let track = step.into_track();
            let stream_id = inner.next_stream_id();
            let handle = TrackEndHandle::new(self.self_ref.clone(), stream_id);

            match sink.play(&track.locator, handle).await {
                Ok(()) => {
                    inner.active_stream = Some(stream_id);
                    inner.is_paused = false;

                    info!("Guild {} now playing `{}`", self.guild_id, track.title);
                    self.emit(EventType::TrackStart(track.clone()));

                    return Ok(AdvanceOutcome {
                        started: Some(track),
                        skipped,
                    });
                },
                Err(why) => {
                    warn!("Guild {} failed to start `{}`: {}", self.guild_id, track.title, why);
                    self.emit(EventType::TrackFailed(track.clone(), why.clone()));

                    skipped.push((track, why));
                    allow_replay = false;

                    if skipped.len() >= budget {
                        inner.state.set_current(None);
                        inner.active_stream = None;
                        self.persist(&inner.state).await;

                        error!("Guild {} gave up after {} failed start(s)", self.guild_id, skipped.len());

                        let attempts = skipped.len();
                        let last = skipped.pop().map(|(_, why)| why).unwrap_or(SinkError::NotConnected);

                        return Err(PlayerError::PlaybackStart { attempts, last });
                    }
                }
            }
        }
    }

    pub(crate) async fn on_track_end(&self, stream_id: u64) {
        let mut inner = self.inner.lock().await;

        if inner.active_stream != Some(stream_id) {
            debug!("Ignoring stale end of stream {} on guild {}", stream_id, self.guild_id);
            return;
        }

        inner.active_stream = None;

        match self.advance_locked(&mut inner).await {
            Ok(_) => (),
            Err(PlayerError::NotConnected) => {
                inner.state.set_current(None);
                self.persist(&inner.state).await;
            },
            Err(why) => error!("Error advancing queue on guild {}: {}", self.guild_id, why),
        }
    }

    // Last resort without a runtime: forget the stream so the player can start again.
    pub(crate) fn abandon_stream(&self, stream_id: u64) {
        if let Ok(mut inner) = self.inner.try_lock() {
            if inner.active_stream == Some(stream_id) {
                inner.active_stream = None;
            }
        }
    }

    pub(crate) fn track_ingestion(&self, handle: AbortHandle) {
        let mut ingestions = self.ingestions.lock();

        ingestions.retain(|running| !running.is_finished());
        ingestions.push(handle);
    }

    pub(crate) fn ingestion_finished(&self, added: usize, total: usize) {
        self.emit(EventType::IngestionFinished { added, total });
    }

    fn cancel_ingestions(&self) {
        for handle in self.ingestions.lock().drain(..) {
            if !handle.is_finished() {
                info!("Cancelling playlist ingestion on guild {}", self.guild_id);
                handle.abort();
            }
        }
    }

    fn emit(&self, event: EventType) {
        if let Some(player) = self.self_ref.upgrade() {
            process(player, Arc::clone(&self.event_handler), event);
        }
    }

    async fn persist(&self, state: &QueueState) {
        if let Err(why) = self.store.save(self.guild_id, &state.snapshot()).await {
            error!("Error saving queue for guild {}: {}", self.guild_id, why);
        }
    }
}

async fn halt(sink: &dyn AudioSink) {
    if sink.is_playing() || sink.is_paused() {
        sink.stop().await;
    }
}

impl std::fmt::Debug for MusicPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicPlayer")
            .field("guild_id", &self.guild_id)
            .field("config", &self.config)
            .finish()
    }
}
