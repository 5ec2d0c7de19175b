//! Queue and loop bookkeeping for a single guild.
//!
//! Everything in here is synchronous and in-memory; [`MusicPlayer`] wraps it
//! with the per-guild lock, the audio sink and persistence.
//!
//! [`MusicPlayer`]: crate::player::MusicPlayer

use std::collections::VecDeque;
use rand::{seq::SliceRandom, Rng};
use tracing::warn;
use crate::{
    error::{PlayerError, PlayerResult},
    model::{QueuePage, QueueSnapshot, TrackRef},
    types::UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Stop once the queue drains.
    Off,
    /// Replay the current track forever.
    Song,
    /// Refill the queue from the loop snapshot once it drains.
    Queue,
}

impl Default for LoopMode {
    fn default() -> Self {
        LoopMode::Off
    }
}

/// What the next advance should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Song loop: the current track again, queue untouched.
    Replay(TrackRef),
    /// Head of the queue, now the current track.
    Next(TrackRef),
}

impl Step {
    pub fn track(&self) -> &TrackRef {
        match self {
            Step::Replay(track) | Step::Next(track) => track,
        }
    }

    pub fn into_track(self) -> TrackRef {
        match self {
            Step::Replay(track) | Step::Next(track) => track,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueState {
    queue: VecDeque<TrackRef>,
    original_queue: Vec<TrackRef>,
    current: Option<TrackRef>,
    loop_mode: LoopMode,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: QueueSnapshot) -> Self {
        let loop_mode = match (snapshot.loop_song, snapshot.loop_queue) {
            (true, true) => {
                warn!("Snapshot has both song and queue loop enabled, keeping song loop");
                LoopMode::Song
            },
            (true, false) => LoopMode::Song,
            (false, true) => LoopMode::Queue,
            (false, false) => LoopMode::Off,
        };

        let original_queue = if loop_mode == LoopMode::Queue {
            snapshot.original_queue
        } else {
            Vec::new()
        };

        Self {
            queue: snapshot.queue.into(),
            original_queue,
            current: snapshot.current,
            loop_mode,
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queue: self.queue.iter().cloned().collect(),
            original_queue: self.original_queue.clone(),
            current: self.current.clone(),
            loop_song: self.loop_song(),
            loop_queue: self.loop_queue(),
        }
    }

    pub fn queue(&self) -> &VecDeque<TrackRef> {
        &self.queue
    }

    pub fn original_queue(&self) -> &[TrackRef] {
        &self.original_queue
    }

    pub fn current(&self) -> Option<&TrackRef> {
        self.current.as_ref()
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn loop_song(&self) -> bool {
        self.loop_mode == LoopMode::Song
    }

    pub fn loop_queue(&self) -> bool {
        self.loop_mode == LoopMode::Queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Appends tracks in the given order and returns how many were added.
    ///
    /// With queue loop active every track is also appended to the loop
    /// snapshot as its own copy. A `requester` overrides whatever requester the
    /// tracks already carry.
    pub fn enqueue<I>(&mut self, tracks: I, requester: Option<UserId>) -> usize
    where
        I: IntoIterator<Item = TrackRef>,
    {
        let mut count = 0;

        for mut track in tracks {
            if requester.is_some() {
                track.requester_id = requester;
            }

            if self.loop_queue() {
                self.original_queue.push(track.clone());
            }

            self.queue.push_back(track);
            count += 1;
        }

        count
    }

    /// Appends tracks and turns queue loop on with the whole queue as the
    /// loop snapshot. The current track is left out of the snapshot.
    pub fn enqueue_looped<I>(&mut self, tracks: I, requester: Option<UserId>) -> usize
    where
        I: IntoIterator<Item = TrackRef>,
    {
        let count = self.enqueue(tracks, requester);

        self.loop_mode = LoopMode::Queue;
        self.original_queue = self.queue.iter().cloned().collect();

        count
    }

    /// Empties the queue and the loop snapshot. Current track and loop mode stay.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.original_queue.clear();
    }

    pub fn shuffle(&mut self) -> PlayerResult<()> {
        self.shuffle_with(&mut rand::thread_rng())
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> PlayerResult<()> {
        if self.queue.len() < 2 {
            return Err(PlayerError::InvalidOperation(
                "Need at least 2 tracks in queue to shuffle".to_string(),
            ));
        }

        self.queue.make_contiguous().shuffle(rng);

        // The loop snapshot follows the new order; any older ordering is dropped.
        if self.loop_queue() {
            self.original_queue = self.playing_order();
        }

        Ok(())
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;

        if mode == LoopMode::Queue {
            self.original_queue = self.playing_order();
        } else {
            self.original_queue.clear();
        }
    }

    /// Returns whether song loop is enabled afterwards.
    pub fn toggle_loop_song(&mut self) -> bool {
        let mode = if self.loop_song() { LoopMode::Off } else { LoopMode::Song };
        self.set_loop_mode(mode);

        self.loop_song()
    }

    /// Returns whether queue loop is enabled afterwards.
    pub fn toggle_loop_queue(&mut self) -> bool {
        let mode = if self.loop_queue() { LoopMode::Off } else { LoopMode::Queue };
        self.set_loop_mode(mode);

        self.loop_queue()
    }

    /// Back to an idle, empty player with every loop disabled.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.original_queue.clear();
        self.current = None;
        self.loop_mode = LoopMode::Off;
    }

    pub(crate) fn set_current(&mut self, track: Option<TrackRef>) {
        self.current = track;
    }

    /// Picks the next track and makes it current.
    ///
    /// `allow_replay` is cleared by the caller once the current track failed
    /// to start, so a broken track is never looped. Returns `None` and clears
    /// `current` when there is nothing left to play.
    pub fn next_step(&mut self, allow_replay: bool) -> Option<Step> {
        if allow_replay && self.loop_song() {
            if let Some(current) = &self.current {
                return Some(Step::Replay(current.clone()));
            }
        }

        if self.queue.is_empty() && self.loop_queue() && !self.original_queue.is_empty() {
            self.refill();
        }

        match self.queue.pop_front() {
            Some(track) => {
                self.current = Some(track.clone());
                Some(Step::Next(track))
            },
            None => {
                self.current = None;
                None
            }
        }
    }

    /// Whether [`next_step`](Self::next_step) would pick a track.
    pub fn has_next(&self) -> bool {
        (self.loop_song() && self.current.is_some())
            || !self.queue.is_empty()
            || (self.loop_queue() && !self.original_queue.is_empty())
    }

    /// Refills the queue from the loop snapshot, resuming after the current
    /// track when it is part of the snapshot and not its last entry.
    fn refill(&mut self) {
        let resume_at = self
            .current
            .as_ref()
            .and_then(|current| {
                self.original_queue
                    .iter()
                    .position(|track| track.locator == current.locator)
            })
            .map(|index| index + 1)
            .filter(|next| *next < self.original_queue.len())
            .unwrap_or(0);

        self.queue = self.original_queue[resume_at..].iter().cloned().collect();
    }

    /// Read-only view of one page of the queue. Out of range pages are empty.
    pub fn page(&self, page: usize, per_page: usize) -> QueuePage {
        let per_page = per_page.max(1);
        let len = self.queue.len();
        let total_pages = (len / per_page + usize::from(len % per_page != 0)).max(1);

        let tracks = self
            .queue
            .iter()
            .skip(page.saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .collect();

        QueuePage {
            tracks,
            page,
            total_pages,
        }
    }

    fn playing_order(&self) -> Vec<TrackRef> {
        self.current
            .iter()
            .chain(self.queue.iter())
            .cloned()
            .collect()
    }
}
