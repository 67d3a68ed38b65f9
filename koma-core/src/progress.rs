/// Position within the open chapter or archive. Pages are 1-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadingProgress {
    pub current_page: usize,
    pub total_pages: usize,
}

impl ReadingProgress {
    pub fn new(total_pages: usize) -> Self {
        Self {
            current_page: total_pages.min(1),
            total_pages,
        }
    }

    /// Record the first visible index as the current page, clamped to the last page.
    pub fn visible(&mut self, index: usize) {
        self.current_page = index.saturating_add(1).min(self.total_pages);
    }

    pub fn percent(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        self.current_page as f64 / self.total_pages as f64 * 100.0
    }
}
