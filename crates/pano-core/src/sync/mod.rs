use ahash::AHashMap;
use chrono::{Datelike, NaiveDate};

use crate::selection::SelectionKey;

/// Maps every selectable identity (a year or a capture date) to the members of
/// one view that belong to it
///
/// Each view keeps its own index so it can render a selection without asking
/// any other view. Members are kept in insertion order.
#[derive(Debug, Clone)]
pub struct MembershipIndex<M> {
    members: Vec<(M, NaiveDate)>,
    by_year: AHashMap<i32, Vec<usize>>,
    by_date: AHashMap<NaiveDate, Vec<usize>>,
}

impl<M: Copy> MembershipIndex<M> {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            by_year: AHashMap::new(),
            by_date: AHashMap::new(),
        }
    }

    /// Register a member captured on `date`
    pub fn insert(&mut self, member: M, date: NaiveDate) {
        let slot = self.members.len();
        self.members.push((member, date));
        self.by_year.entry(date.year()).or_default().push(slot);
        self.by_date.entry(date).or_default().push(slot);
    }

    /// Members matching `key`, in insertion order
    pub fn members_for(&self, key: &SelectionKey) -> Vec<M> {
        let slots = match key {
            SelectionKey::None => return Vec::new(),
            SelectionKey::Year(year) => self.by_year.get(year),
            SelectionKey::Date(date) => self.by_date.get(date),
        };
        slots
            .map(|slots| slots.iter().map(|&i| self.members[i].0).collect())
            .unwrap_or_default()
    }

    /// Number of members captured in `year`
    pub fn year_len(&self, year: i32) -> usize {
        self.by_year.get(&year).map_or(0, Vec::len)
    }

    /// Number of members captured on `date`
    pub fn date_len(&self, date: NaiveDate) -> usize {
        self.by_date.get(&date).map_or(0, Vec::len)
    }

    /// Every member with its capture date
    pub fn iter(&self) -> impl Iterator<Item = (M, NaiveDate)> + '_ {
        self.members.iter().copied()
    }

    /// Years present in the index, ascending
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.by_year.keys().copied().collect();
        years.sort_unstable();
        years
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Forget every member
    pub fn clear(&mut self) {
        self.members.clear();
        self.by_year.clear();
        self.by_date.clear();
    }
}

impl<M: Copy> Default for MembershipIndex<M> {
    fn default() -> Self {
        Self::new()
    }
}
