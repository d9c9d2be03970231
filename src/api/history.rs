// Client-side history filtering and pagination

use chrono::{DateTime, Utc};

use super::models::HistoryEntry;

/// Entries shown per history page
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Default, Clone)]
pub struct HistoryFilter {
    pub language: Option<String>,
    pub style: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        self.language.as_ref().map_or(true, |l| &entry.language == l)
            && self.style.as_ref().map_or(true, |s| &entry.style == s)
            && self.start.map_or(true, |start| entry.created_at >= start)
            && self.end.map_or(true, |end| entry.created_at <= end)
    }

    pub fn apply(&self, entries: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

/// Number of pages needed for `total` items
pub fn page_count(total: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page)
}

/// Items on 1-based `page`; empty past the end
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(per_page);
    if per_page == 0 || start >= items.len() {
        return &[];
    }
    let end = (start + per_page).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: i64, language: &str, style: &str, day: u32) -> HistoryEntry {
        HistoryEntry {
            id,
            user_id: Some(1),
            original_text: format!("original {}", id),
            paraphrased_text: format!("paraphrased {}", id),
            language: language.to_string(),
            style: style.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap(),
        }
    }

    fn sample() -> Vec<HistoryEntry> {
        vec![
            entry(1, "English", "formal", 1),
            entry(2, "French", "casual", 2),
            entry(3, "English", "casual", 3),
            entry(4, "German", "formal", 4),
        ]
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        assert_eq!(HistoryFilter::default().apply(sample()).len(), 4);
    }

    #[test]
    fn test_filters_combine() {
        let filter = HistoryFilter {
            language: Some("English".to_string()),
            style: Some("casual".to_string()),
            ..Default::default()
        };
        let ids: Vec<i64> = filter.apply(sample()).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let filter = HistoryFilter {
            start: Some(Utc.with_ymd_and_hms(2026, 10, 2, 12, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2026, 10, 3, 12, 0, 0).unwrap()),
            ..Default::default()
        };
        let ids: Vec<i64> = filter.apply(sample()).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=12).collect();
        assert_eq!(paginate(&items, 1, 5), &[1, 2, 3, 4, 5]);
        assert_eq!(paginate(&items, 3, 5), &[11, 12]);
        assert!(paginate(&items, 4, 5).is_empty());
        // Page 0 is treated as the first page
        assert_eq!(paginate(&items, 0, 5), &[1, 2, 3, 4, 5]);
        assert!(paginate(&items, 1, 0).is_empty());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 5), 0);
        assert_eq!(page_count(5, 5), 1);
        assert_eq!(page_count(12, 5), 3);
        assert_eq!(page_count(3, 0), 0);
    }
}
