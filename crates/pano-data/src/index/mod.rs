//! Incremental group-by-year and group-by-day summaries built during ingestion

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use pano_core::MarkerHandle;

use crate::schema::{format_date_key, parse_capture_date, ValidRecord};

/// Markers sharing one capture year
#[derive(Debug, Clone, PartialEq)]
pub struct YearBucket {
    year: i32,
    markers: Vec<MarkerHandle>,
}

impl YearBucket {
    fn new(year: i32) -> Self {
        Self {
            year,
            markers: Vec::new(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn markers(&self) -> &[MarkerHandle] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Per-day record counts; counts only ever grow
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalAggregate {
    counts: BTreeMap<NaiveDate, u64>,
}

impl TemporalAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more record captured on `date`
    pub fn increment(&mut self, date: NaiveDate) {
        *self.counts.entry(date).or_insert(0) += 1;
    }

    pub fn count(&self, date: NaiveDate) -> u64 {
        self.counts.get(&date).copied().unwrap_or(0)
    }

    /// Look up a count by its `YYYY-MM-DD` key
    pub fn count_for_key(&self, key: &str) -> u64 {
        parse_capture_date(key).map_or(0, |date| self.count(date))
    }

    /// Entries in ascending date order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.counts.iter().map(|(date, count)| (*date, *count))
    }

    /// Entries keyed by their `YYYY-MM-DD` string
    pub fn keyed(&self) -> Vec<(String, u64)> {
        self.iter()
            .map(|(date, count)| (format_date_key(date), count))
            .collect()
    }

    /// Number of distinct days
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Oldest captured day
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.counts.keys().next().copied()
    }
}

/// Everything one load has accepted so far
#[derive(Debug, Clone, Default)]
pub struct AggregateIndex {
    records: Vec<ValidRecord>,
    buckets: IndexMap<i32, YearBucket>,
    temporal: TemporalAggregate,
}

impl AggregateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an accepted record and the marker created for it
    pub fn insert(&mut self, record: ValidRecord, marker: MarkerHandle) {
        let year = record.capture_date.year();
        self.buckets
            .entry(year)
            .or_insert_with(|| YearBucket::new(year))
            .markers
            .push(marker);
        self.temporal.increment(record.capture_date);
        self.records.push(record);
    }

    /// Accepted records in file order
    pub fn records(&self) -> &[ValidRecord] {
        &self.records
    }

    pub fn bucket(&self, year: i32) -> Option<&YearBucket> {
        self.buckets.get(&year)
    }

    /// Year buckets in the order their first record arrived
    pub fn buckets(&self) -> impl Iterator<Item = &YearBucket> {
        self.buckets.values()
    }

    /// `(year, marker count)` ascending by year
    pub fn year_counts(&self) -> Vec<(i32, usize)> {
        let mut counts: Vec<(i32, usize)> = self
            .buckets
            .values()
            .map(|bucket| (bucket.year, bucket.len()))
            .collect();
        counts.sort_unstable_by_key(|(year, _)| *year);
        counts
    }

    pub fn temporal(&self) -> &TemporalAggregate {
        &self.temporal
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.buckets.clear();
        self.temporal = TemporalAggregate::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pano_core::Coordinate;

    fn record(id: &str, y: i32, m: u32, d: u32) -> ValidRecord {
        ValidRecord {
            record_id: id.to_string(),
            origin: None,
            sample: Coordinate::new(0.0, 0.0),
            capture_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            attribution: "Google".to_string(),
        }
    }

    #[test]
    fn test_buckets_and_counts() {
        let mut index = AggregateIndex::new();
        index.insert(record("a", 2021, 5, 1), MarkerHandle(1));
        index.insert(record("b", 2019, 5, 1), MarkerHandle(2));
        index.insert(record("c", 2021, 5, 1), MarkerHandle(3));

        assert_eq!(index.len(), 3);
        assert_eq!(index.year_counts(), vec![(2019, 1), (2021, 2)]);
        assert_eq!(
            index.bucket(2021).unwrap().markers(),
            &[MarkerHandle(1), MarkerHandle(3)]
        );
        let first_seen: Vec<i32> = index.buckets().map(YearBucket::year).collect();
        assert_eq!(first_seen, vec![2021, 2019]);

        assert_eq!(index.temporal().count_for_key("2021-05-01"), 2);
        assert_eq!(index.temporal().total(), 3);
        assert_eq!(
            index.temporal().keyed(),
            vec![("2019-05-01".to_string(), 1), ("2021-05-01".to_string(), 2)]
        );
    }

    #[test]
    fn test_clear() {
        let mut index = AggregateIndex::new();
        index.insert(record("a", 2000, 1, 1), MarkerHandle(1));
        index.clear();
        assert!(index.is_empty());
        assert!(index.temporal().is_empty());
        assert!(index.bucket(2000).is_none());
    }
}
