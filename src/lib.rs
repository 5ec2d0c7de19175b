//! Per-guild music queues for chat bots.
//!
//! A [`PlayerRegistry`] hands out one [`MusicPlayer`] per guild. Players own the
//! queue, the queue-loop snapshot and the current track, drive an external
//! [`AudioSink`] through the track-by-track state machine and persist every
//! change through a [`QueueStore`].
//!
//! [`PlayerRegistry`]: registry::PlayerRegistry
//! [`MusicPlayer`]: player::MusicPlayer
//! [`AudioSink`]: sink::AudioSink
//! [`QueueStore`]: store::QueueStore

pub mod types;
pub mod error;
pub mod model;
pub mod state;
pub mod sink;
pub mod events;
pub mod player;
pub mod store;
pub mod registry;
pub mod resolver;
pub mod builder;
pub mod node;
pub mod request;
pub mod display;
