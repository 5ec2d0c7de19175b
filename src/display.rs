use crate::state::{LoopMode, QueueState};

/// Page cursor over a guild queue, as driven by previous/next buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueView {
    page: usize,
    per_page: usize,
}

impl QueueView {
    pub fn new(per_page: usize) -> Self {
        Self::at(0, per_page)
    }

    pub fn at(page: usize, per_page: usize) -> Self {
        Self {
            page,
            per_page: per_page.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn total_pages(&self, state: &QueueState) -> usize {
        state.page(self.page, self.per_page).total_pages
    }

    /// Buttons are pointless for an empty or single page queue.
    pub fn show_controls(&self, state: &QueueState) -> bool {
        !state.is_empty() && self.total_pages(state) > 1
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self, state: &QueueState) -> bool {
        self.page + 1 < self.total_pages(state)
    }

    /// Moves one page back. Returns false when already on the first page.
    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }

        self.page -= 1;
        true
    }

    /// Moves one page forward. Returns false when already on the last page.
    pub fn next(&mut self, state: &QueueState) -> bool {
        if !self.has_next(state) {
            return false;
        }

        self.page += 1;
        true
    }

    pub fn page_label(&self, state: &QueueState) -> String {
        format!("Page {}/{}", self.page + 1, self.total_pages(state))
    }

    /// Chat-ready text for the current page: now playing, loop status and
    /// a numbered slice of the queue.
    pub fn render(&self, state: &QueueState) -> String {
        let mut lines = Vec::new();

        if let Some(current) = state.current() {
            lines.push(format!("**Now Playing:** {}", current.title));
        }

        match state.loop_mode() {
            LoopMode::Song => lines.push("**Status:** 🔁 Song Loop".to_string()),
            LoopMode::Queue => lines.push("**Status:** 🔁 Queue Loop".to_string()),
            LoopMode::Off => (),
        }

        if state.is_empty() {
            lines.push("\n**Queue is empty**".to_string());
            return lines.join("\n");
        }

        let page = state.page(self.page, self.per_page);

        lines.push(format!("\n**Queue:** ({} tracks)", state.len()));
        lines.push(format!("**Page {}/{}**\n", self.page + 1, page.total_pages));

        let first = self.page * self.per_page + 1;
        for (number, track) in (first..).zip(page.tracks.iter()) {
            lines.push(format!("{}. {}", number, track.title));
        }

        lines.join("\n")
    }
}

impl Default for QueueView {
    fn default() -> Self {
        Self::new(15)
    }
}
