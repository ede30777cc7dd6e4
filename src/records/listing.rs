use std::cmp::Ordering;
use std::collections::HashMap;

use super::{RecordKey, StreamerRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Viewers,
    Followers,
    Name,
}

/// Presentation-side view over a fetched collection: live filter, text filter and ordering.
#[derive(Debug, Clone, Default)]
pub struct ListingView {
    pub sort: SortKey,
    pub live_only: bool,
    pub query: String,
}

impl ListingView {
    pub fn apply(&self, records: &[StreamerRecord]) -> Vec<StreamerRecord> {
        let needle = self.query.trim().to_lowercase();

        let mut visible: Vec<StreamerRecord> = latest_by_key(records)
            .into_iter()
            .filter(|record| !self.live_only || record.is_live())
            .filter(|record| needle.is_empty() || record.matches_lowercase(&needle))
            .collect();

        // stable sort keeps arrival order among equal keys
        visible.sort_by(|a, b| compare(self.sort, a, b));
        visible
    }
}

/// Local fallback search over an already-fetched collection.
pub fn filter_records(records: &[StreamerRecord], query: &str) -> Vec<StreamerRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| record.matches_lowercase(&needle))
        .cloned()
        .collect()
}

pub fn live_count(records: &[StreamerRecord]) -> usize {
    records.iter().filter(|record| record.is_live()).count()
}

/// Collapse records sharing a key; the later value wins but keeps the first position.
fn latest_by_key(records: &[StreamerRecord]) -> Vec<StreamerRecord> {
    let mut positions: HashMap<RecordKey, usize> = HashMap::new();
    let mut unique: Vec<StreamerRecord> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(&record.key()) {
            Some(&index) => unique[index] = record.clone(),
            None => {
                positions.insert(record.key(), unique.len());
                unique.push(record.clone());
            }
        }
    }

    unique
}

fn compare(sort: SortKey, a: &StreamerRecord, b: &StreamerRecord) -> Ordering {
    match sort {
        SortKey::Viewers => b.viewers.unwrap_or(0).cmp(&a.viewers.unwrap_or(0)),
        SortKey::Followers => b.followers.unwrap_or(0).cmp(&a.followers.unwrap_or(0)),
        SortKey::Name => a.label().to_lowercase().cmp(&b.label().to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(username: &str, viewers: Option<u64>, followers: Option<u64>) -> StreamerRecord {
        let mut record = StreamerRecord::new(username);
        record.viewers = viewers;
        record.followers = followers;
        record
    }

    #[test]
    fn sorts_by_viewers_treating_missing_as_zero() {
        let records = vec![
            record("a", None, Some(5)),
            record("b", Some(30), None),
            record("c", Some(7), None),
        ];

        let view = ListingView::default();
        let names: Vec<_> = view
            .apply(&records)
            .into_iter()
            .map(|r| r.username)
            .collect();
        assert_eq!(names, ["b", "c", "a"]);
    }

    #[test]
    fn sorts_by_name_using_display_label() {
        let mut zed = record("aaa", None, None);
        zed.display_name = Some("Zed".to_string());
        let records = vec![zed, record("Bob", None, None)];

        let view = ListingView {
            sort: SortKey::Name,
            ..ListingView::default()
        };
        let labels: Vec<_> = view
            .apply(&records)
            .iter()
            .map(|r| r.label().to_string())
            .collect();
        assert_eq!(labels, ["Bob", "Zed"]);
    }

    #[test]
    fn live_only_drops_unknown_and_offline() {
        let mut live = record("live", None, None);
        live.is_live = Some(true);
        let mut offline = record("offline", None, None);
        offline.is_live = Some(false);
        let records = vec![live, offline, record("unknown", None, None)];

        let view = ListingView {
            live_only: true,
            ..ListingView::default()
        };
        let visible = view.apply(&records);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].username, "live");
        assert_eq!(live_count(&records), 1);
    }

    #[test]
    fn refetched_record_replaces_prior_value() {
        let mut first = record("Kamandd", Some(1), None);
        first.id = Some(9);
        let mut second = record("Kamandd", Some(50), None);
        second.id = Some(9);

        let visible = ListingView::default().apply(&[first, second]);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].viewers, Some(50));
    }

    #[test]
    fn filter_records_matches_game_case_insensitively() {
        let mut gamer = record("Siabach", None, None);
        gamer.game = Some("Counter-Strike 2".to_string());
        let records = vec![gamer, record("Eyzed", None, None)];

        let found = filter_records(&records, "  COUNTER ");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "Siabach");
        assert_eq!(filter_records(&records, "").len(), 2);
    }
}
