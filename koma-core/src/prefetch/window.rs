use std::ops::RangeInclusive;

use crate::config::PrefetchConfig;

/// Indices eligible for eager decode around the visible page: `[center - behind, center + radius]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefetchWindow {
    pub center: usize,
    pub radius: usize,
    pub behind: usize,
}

impl PrefetchWindow {
    pub fn new(center: usize, cfg: &PrefetchConfig) -> Self {
        Self {
            center,
            radius: cfg.look_ahead,
            behind: cfg.look_behind,
        }
    }

    /// The window clamped to `[0, entry_count - 1]`; `None` when nothing is left.
    pub fn range(&self, entry_count: usize) -> Option<RangeInclusive<usize>> {
        let last = entry_count.checked_sub(1)?;
        let start = self.center.saturating_sub(self.behind);
        let end = self.center.saturating_add(self.radius).min(last);
        (start <= end).then_some(start..=end)
    }

    /// Window indices nearest-first; at equal distance the page ahead comes first.
    pub fn indices(&self, entry_count: usize) -> Vec<usize> {
        let Some(range) = self.range(entry_count) else {
            return Vec::new();
        };
        let mut out: Vec<usize> = range.collect();
        out.sort_by_key(|&i| (self.center.abs_diff(i), i < self.center));
        out
    }

    pub fn within_margin(&self, index: usize, margin: usize) -> bool {
        self.center.abs_diff(index) <= margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(center: usize, radius: usize) -> PrefetchWindow {
        PrefetchWindow {
            center,
            radius,
            behind: 1,
        }
    }

    #[test]
    fn one_behind_radius_ahead() {
        let w = window(5, 3);
        let mut got = w.indices(20);
        got.sort();
        assert_eq!(got, vec![4, 5, 6, 7, 8]);
        assert!(!got.contains(&3));
    }

    #[test]
    fn nearest_first_ahead_before_behind() {
        assert_eq!(window(5, 3).indices(20), vec![5, 6, 4, 7, 8]);
    }

    #[test]
    fn clamped_at_both_ends() {
        assert_eq!(window(0, 3).range(20), Some(0..=3));
        assert_eq!(window(18, 3).range(20), Some(17..=19));
        assert_eq!(window(0, 3).indices(1), vec![0]);
    }

    #[test]
    fn empty_archive_or_center_past_end() {
        assert_eq!(window(0, 3).range(0), None);
        assert_eq!(window(30, 3).indices(20), Vec::<usize>::new());
    }

    #[test]
    fn margin() {
        let w = window(10, 3);
        assert!(w.within_margin(6, 4));
        assert!(!w.within_margin(5, 4));
        assert!(!w.within_margin(15, 4));
    }

    #[test]
    fn from_config() {
        let w = PrefetchWindow::new(2, &PrefetchConfig::default());
        assert_eq!(w.range(100), Some(1..=5));
    }
}
