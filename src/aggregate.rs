use crate::model::CommitRecord;
use crate::period::{derive_key, Granularity, PeriodKey};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Rendered entries per period, in arrival order within each period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangelogBucket {
    periods: BTreeMap<PeriodKey, Vec<String>>,
}

impl ChangelogBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: PeriodKey, entry: String) {
        self.periods.entry(key).or_default().push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    pub fn total_entries(&self) -> usize {
        self.periods.values().map(Vec::len).sum()
    }

    pub fn entries(&self, key: &PeriodKey) -> Option<&[String]> {
        self.periods.get(key).map(Vec::as_slice)
    }

    /// Periods newest first.
    pub fn iter_desc(&self) -> impl Iterator<Item = (&PeriodKey, &[String])> {
        self.periods.iter().rev().map(|(k, v)| (k, v.as_slice()))
    }

    /// `(period, entry count)` newest first.
    pub fn distribution(&self) -> Vec<(PeriodKey, usize)> {
        self.iter_desc().map(|(k, v)| (*k, v.len())).collect()
    }

    /// Regroups into coarser periods, keeping arrival order of each entry.
    pub fn regroup(&self, granularity: Granularity) -> ChangelogBucket {
        let mut grouped = ChangelogBucket::new();
        for (key, entries) in self.iter_desc() {
            let target = derive_key(key.date(), granularity);
            for entry in entries {
                grouped.push(target, entry.clone());
            }
        }
        grouped
    }
}

/// Outcome of aggregation plus the counts used as a drop guard.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub bucket: ChangelogBucket,
    pub input_count: usize,
}

impl Aggregation {
    pub fn preserved(&self) -> bool {
        self.bucket.total_entries() == self.input_count
    }
}

/// Groups commits by calendar date.
pub fn bucket_by_date(commits: &[CommitRecord]) -> ChangelogBucket {
    aggregate(commits, Granularity::Day).bucket
}

pub fn aggregate(commits: &[CommitRecord], granularity: Granularity) -> Aggregation {
    let mut bucket = ChangelogBucket::new();
    for commit in commits {
        bucket.push(derive_key(commit.date, granularity), commit.rendered_entry.clone());
    }

    let aggregation = Aggregation {
        bucket,
        input_count: commits.len(),
    };

    for (period, count) in aggregation.bucket.distribution() {
        tracing::debug!(%period, count, "period distribution");
    }
    if !aggregation.preserved() {
        tracing::error!(
            expected = aggregation.input_count,
            found = aggregation.bucket.total_entries(),
            "commit count mismatch after grouping"
        );
    }

    aggregation
}

/// Newest date across all commits.
pub fn newest_date(commits: &[CommitRecord]) -> Option<NaiveDate> {
    commits.iter().map(|c| c.date).max()
}
