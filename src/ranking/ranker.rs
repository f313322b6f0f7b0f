use crate::scoring::ScoredRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankOrder {
    /// Highest score first
    #[default]
    Descending,
    /// Lowest score first (times, where lower is better)
    Ascending,
    /// Least remaining first; completed entries always last
    Progress,
}

impl RankOrder {
    /// Whether a higher score beats a lower one under this order
    pub fn higher_is_better(self) -> bool {
        !matches!(self, RankOrder::Ascending)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub rank: usize,
    pub is_top_entry: bool,
    pub entry: ScoredRecord,
}

impl RankedEntry {
    pub fn into_scored(self) -> ScoredRecord {
        self.entry
    }
}

/// Sort scored records and assign 1-based ordinal ranks.
///
/// Ties on the primary key are broken by display name, then id, so the result
/// never depends on input order.
pub fn rank(mut scored: Vec<ScoredRecord>, order: RankOrder) -> Vec<RankedEntry> {
    scored.sort_by(|a, b| compare(a, b, order));

    scored
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| RankedEntry {
            rank: idx + 1,
            is_top_entry: idx == 0,
            entry,
        })
        .collect()
}

fn compare(a: &ScoredRecord, b: &ScoredRecord, order: RankOrder) -> Ordering {
    let primary = match order {
        RankOrder::Descending => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        RankOrder::Ascending => a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal),
        RankOrder::Progress => {
            let (a_done, a_remaining) = progress_key(a);
            let (b_done, b_remaining) = progress_key(b);
            a_done.cmp(&b_done).then_with(|| {
                a_remaining
                    .partial_cmp(&b_remaining)
                    .unwrap_or(Ordering::Equal)
            })
        }
    };

    primary
        .then_with(|| compare_names(&a.record.name, &b.record.name))
        .then_with(|| a.record.id.cmp(&b.record.id))
}

// Records without progress sort as incomplete with nothing done
fn progress_key(scored: &ScoredRecord) -> (bool, f64) {
    match scored.progress {
        Some(detail) => (detail.completed, detail.remaining),
        None => (false, f64::INFINITY),
    }
}

/// Name order for tie-breaks: base letters first (accents and case folded,
/// "ß" as "ss"), then the lowercase form with accents, then the raw string.
/// Places "Ärger" among the A names rather than after "Z".
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

fn collation_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.nfd().filter(|c| !is_combining_mark(*c)) {
        match c {
            'ß' | 'ẞ' => key.push_str("ss"),
            c => key.extend(c.to_lowercase()),
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Record;
    use crate::scoring::{score_all, CostEfficiency, Formula, Progress};

    fn scored(name: &str, score: f64) -> ScoredRecord {
        ScoredRecord {
            record: Record::new(name, name),
            score,
            incomplete: false,
            progress: None,
        }
    }

    fn names(entries: &[RankedEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.entry.record.name.as_str()).collect()
    }

    fn participant(name: &str, remaining: f64) -> Record {
        Record::new(name, name).with_input("total_remaining", remaining)
    }

    #[test]
    fn test_descending_default() {
        let ranked = rank(
            vec![scored("b", 1.0), scored("a", 3.0), scored("c", 2.0)],
            RankOrder::Descending,
        );
        assert_eq!(names(&ranked), vec!["a", "c", "b"]);
        assert_eq!(
            ranked.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_ascending() {
        let ranked = rank(
            vec![scored("slow", 5.1), scored("fast", 4.2)],
            RankOrder::Ascending,
        );
        assert_eq!(names(&ranked), vec!["fast", "slow"]);
    }

    #[test]
    fn test_tie_break_by_name_not_insertion_order() {
        let ranked = rank(
            vec![scored("zoe", 1.0), scored("Anna", 1.0), scored("bernd", 1.0)],
            RankOrder::Descending,
        );
        assert_eq!(names(&ranked), vec!["Anna", "bernd", "zoe"]);
    }

    #[test]
    fn test_exactly_one_top_entry() {
        let ranked = rank(
            vec![scored("a", 1.0), scored("b", 1.0), scored("c", 0.0)],
            RankOrder::Descending,
        );
        assert!(ranked[0].is_top_entry);
        assert_eq!(ranked.iter().filter(|e| e.is_top_entry).count(), 1);
    }

    #[test]
    fn test_empty_collection() {
        assert!(rank(Vec::new(), RankOrder::Descending).is_empty());
    }

    #[test]
    fn test_rank_is_idempotent() {
        let formula = Formula::CostEfficiency(CostEfficiency::default());
        let records = vec![
            Record::new("1", "Pils")
                .with_input("volume", 0.5)
                .with_input("price", 0.79)
                .with_input("alcohol_content", 4.9),
            Record::new("2", "Korn")
                .with_input("volume", 0.7)
                .with_input("price", 6.99)
                .with_input("alcohol_content", 32.0),
            Record::new("3", "Broken").with_input("price", 0.0),
        ];
        let once = rank(score_all(&records, &formula), RankOrder::Descending);
        let twice = rank(
            once.clone().into_iter().map(RankedEntry::into_scored).collect(),
            RankOrder::Descending,
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn test_progress_completed_last() {
        let formula = Formula::Progress(Progress::default());
        let records = vec![
            participant("Done", 0.0),
            participant("Almost", 10.0),
            participant("Starting", 480.0),
        ];
        let ranked = rank(score_all(&records, &formula), RankOrder::Progress);
        assert_eq!(names(&ranked), vec!["Almost", "Starting", "Done"]);
        assert!(ranked[0].is_top_entry);
    }

    #[test]
    fn test_progress_completed_group_alphabetical() {
        let formula = Formula::Progress(Progress::default());
        let records = vec![
            participant("Zora", 0.0),
            participant("Anna", 0.0),
            participant("Mia", 100.0),
        ];
        let ranked = rank(score_all(&records, &formula), RankOrder::Progress);
        assert_eq!(names(&ranked), vec!["Mia", "Anna", "Zora"]);
        let anna = &ranked[1].entry;
        assert_eq!(anna.score, 100.0);
        assert_eq!(anna.progress.unwrap().done, 500.0);
    }

    #[test]
    fn test_progress_completed_after_higher_scores() {
        // A completed participant with a larger target still sorts after every
        // incomplete one
        let formula = Formula::Progress(Progress::default());
        let records = vec![
            participant("Big", 0.0).with_input("target", 1000.0),
            participant("Small", 1.0),
        ];
        let ranked = rank(score_all(&records, &formula), RankOrder::Progress);
        assert_eq!(names(&ranked), vec!["Small", "Big"]);
    }

    #[test]
    fn test_progress_missing_detail_sorts_with_incomplete() {
        let formula = Formula::Progress(Progress::default());
        let records = vec![
            participant("Done", 0.0),
            Record::new("x", "Unknown"),
            participant("Busy", 250.0),
        ];
        let ranked = rank(score_all(&records, &formula), RankOrder::Progress);
        assert_eq!(names(&ranked), vec!["Busy", "Unknown", "Done"]);
    }

    #[test]
    fn test_compare_names() {
        assert_eq!(compare_names("anna", "Anna"), Ordering::Greater);
        assert_eq!(compare_names("Ärger", "Ärger"), Ordering::Equal);
        assert_eq!(compare_names("ben", "Carl"), Ordering::Less);
    }

    #[test]
    fn test_compare_names_umlauts() {
        assert_eq!(compare_names("Ärger", "Zora"), Ordering::Less);
        assert_eq!(compare_names("Özil", "Peter"), Ordering::Less);
        assert_eq!(compare_names("Özil", "Oliver"), Ordering::Greater);
        assert_eq!(compare_names("Straße", "Strasse"), Ordering::Greater);
        assert_eq!(compare_names("Strasse", "Straße"), Ordering::Less);
        // Accent-free spelling first when base letters match
        assert_eq!(compare_names("Muller", "Müller"), Ordering::Less);
        // Precomposed and decomposed forms share a base key
        assert_eq!(compare_names("Jo\u{0308}rg", "Jörn"), Ordering::Less);
    }

    #[test]
    fn test_tie_break_umlaut_names() {
        let ranked = rank(
            vec![scored("Zora", 1.0), scored("Ärger", 1.0), scored("Bankdrücken", 1.0)],
            RankOrder::Descending,
        );
        assert_eq!(names(&ranked), vec!["Ärger", "Bankdrücken", "Zora"]);
    }
}
