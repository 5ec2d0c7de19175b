use super::track::TrackRef;

/// One page of a guild queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePage {
    pub tracks: Vec<TrackRef>,
    /// Zero-based index that was requested.
    pub page: usize,
    /// Always at least 1, even for an empty queue.
    pub total_pages: usize,
}

impl QueuePage {
    pub fn is_last(&self) -> bool {
        self.page + 1 >= self.total_pages
    }
}
