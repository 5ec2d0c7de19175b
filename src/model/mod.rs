pub mod track;
pub mod snapshot;
pub mod page;
pub mod lavalink;

pub use track::{TrackRef, TrackSearch};
pub use snapshot::QueueSnapshot;
pub use page::QueuePage;
