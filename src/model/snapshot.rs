use serde::{Deserialize, Serialize};
use super::track::TrackRef;

/// Persisted state of one guild's player.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    #[serde(default)]
    pub queue: Vec<TrackRef>,
    #[serde(alias = "original_queue", default)]
    pub original_queue: Vec<TrackRef>,
    #[serde(default)]
    pub current: Option<TrackRef>,
    #[serde(alias = "loop_song", default)]
    pub loop_song: bool,
    #[serde(alias = "loop_queue", default)]
    pub loop_queue: bool,
}

impl QueueSnapshot {
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.original_queue.is_empty() && self.current.is_none()
    }
}
