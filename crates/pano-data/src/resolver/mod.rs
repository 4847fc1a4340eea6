//! Free-text "city, region, country" queries resolved against the dataset
//! directory by weighted edit distance

use std::fmt;

use ahash::AHashSet;

use crate::directory::{DatasetDirectory, DatasetDirectoryEntry};
use crate::ResolveError;

/// Best scores above this are rejected
pub const DEFAULT_MATCH_THRESHOLD: u32 = 3;

/// Number of suggestions offered when nothing matches
pub const MAX_SUGGESTIONS: usize = 3;

/// A parsed location query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQuery {
    pub city: String,
    pub region: Option<String>,
    pub country: Option<String>,
}

/// Region and country identifiers seen anywhere in a directory, lowercased
#[derive(Debug, Clone, Default)]
pub struct KnownIdentifiers {
    regions: AHashSet<String>,
    countries: AHashSet<String>,
}

impl KnownIdentifiers {
    pub fn from_directory(directory: &DatasetDirectory) -> Self {
        let mut known = Self::default();
        for entry in directory.entries() {
            known
                .regions
                .extend(entry.region_identifiers().map(str::to_lowercase));
            known
                .countries
                .extend(entry.country_identifiers().map(str::to_lowercase));
        }
        known
    }

    pub fn is_region(&self, value: &str) -> bool {
        self.regions.contains(&value.to_lowercase())
    }

    pub fn is_country(&self, value: &str) -> bool {
        self.countries.contains(&value.to_lowercase())
    }
}

impl LocationQuery {
    /// Split a query on commas into city, region and country
    ///
    /// A lone qualifier is taken as a country only when it names a known
    /// country and no known region.
    pub fn parse(query: &str, known: &KnownIdentifiers) -> Result<Self, ResolveError> {
        let parts: Vec<&str> = query.split(',').map(str::trim).collect();
        let fail = |reason: &str| ResolveError::QueryParse {
            query: query.to_string(),
            reason: reason.to_string(),
        };

        if parts.iter().any(|p| p.is_empty()) {
            return Err(fail("empty component"));
        }

        match parts.as_slice() {
            [city] => Ok(Self {
                city: city.to_string(),
                region: None,
                country: None,
            }),
            [city, qualifier] => {
                let as_country = known.is_country(qualifier) && !known.is_region(qualifier);
                Ok(Self {
                    city: city.to_string(),
                    region: (!as_country).then(|| qualifier.to_string()),
                    country: as_country.then(|| qualifier.to_string()),
                })
            }
            [city, region, country] => Ok(Self {
                city: city.to_string(),
                region: Some(region.to_string()),
                country: Some(country.to_string()),
            }),
            _ => Err(fail(&format!(
                "expected 1 to 3 comma-separated parts, found {}",
                parts.len()
            ))),
        }
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.city)?;
        for part in [&self.region, &self.country].into_iter().flatten() {
            write!(f, ", {}", part)?;
        }
        Ok(())
    }
}

/// The winning directory entry
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    pub entry: &'a DatasetDirectoryEntry,
    pub score: u32,
}

/// A near miss offered to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub name: String,
    pub region: Option<String>,
    pub country: Option<String>,
    pub score: u32,
}

impl Suggestion {
    fn from_entry(entry: &DatasetDirectoryEntry, score: u32) -> Self {
        Self {
            name: entry.name.clone(),
            region: entry.region.as_ref().map(|r| r.label().to_string()),
            country: entry.country.as_ref().map(|c| c.label().to_string()),
            score,
        }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for part in [&self.region, &self.country].into_iter().flatten() {
            if !part.is_empty() {
                write!(f, ", {}", part)?;
            }
        }
        write!(f, " (score {})", self.score)
    }
}

/// Suffix listing suggestions for an error message; empty if there are none
pub fn format_suggestions(suggestions: &[Suggestion]) -> String {
    if suggestions.is_empty() {
        return String::new();
    }
    let listed: Vec<String> = suggestions.iter().map(Suggestion::to_string).collect();
    format!("; did you mean: {}", listed.join("; "))
}

/// Resolves queries against one directory snapshot
pub struct LocationResolver<'a> {
    directory: &'a DatasetDirectory,
    known: KnownIdentifiers,
    threshold: u32,
}

impl<'a> LocationResolver<'a> {
    pub fn new(directory: &'a DatasetDirectory) -> Self {
        Self {
            directory,
            known: KnownIdentifiers::from_directory(directory),
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Parse and match a free-text query
    pub fn resolve(&self, query: &str) -> Result<MatchResult<'a>, ResolveError> {
        let parsed = LocationQuery::parse(query, &self.known)?;
        self.find_best_match(&parsed)
    }

    /// Lowest-scoring entry, the earliest one on ties
    pub fn find_best_match(&self, query: &LocationQuery) -> Result<MatchResult<'a>, ResolveError> {
        let mut scored: Vec<(usize, u32)> = self
            .directory
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, score_entry(query, entry)))
            .collect();

        let entries = self.directory.entries();
        let best = scored.iter().copied().min_by_key(|&(i, score)| (score, i));

        if let Some((i, score)) = best {
            if score <= self.threshold {
                tracing::debug!("'{}' matched {} with score {}", query, entries[i].name, score);
                return Ok(MatchResult {
                    entry: &entries[i],
                    score,
                });
            }
        }

        scored.sort_by_key(|&(_, score)| score);
        let suggestions = scored
            .iter()
            .take(MAX_SUGGESTIONS)
            .map(|&(i, score)| Suggestion::from_entry(&entries[i], score))
            .collect();

        Err(ResolveError::NoMatch {
            query: query.to_string(),
            best_score: best.map(|(_, score)| score),
            suggestions,
        })
    }
}

/// Resolve `query` against `directory` with the default threshold
pub fn find_best_match<'a>(
    query: &str,
    directory: &'a DatasetDirectory,
) -> Result<MatchResult<'a>, ResolveError> {
    LocationResolver::new(directory).resolve(query)
}

/// 2 × city distance, plus the closest region and country identifier
/// distances when those qualifiers were given
fn score_entry(query: &LocationQuery, entry: &DatasetDirectoryEntry) -> u32 {
    let mut score = 2 * levenshtein(&query.city, &entry.name);
    if let Some(region) = &query.region {
        score += closest(region, entry.region_identifiers());
    }
    if let Some(country) = &query.country {
        score += closest(country, entry.country_identifiers());
    }
    score
}

/// Smallest distance to any candidate; an entry without identifiers costs the
/// full length of the qualifier
fn closest<'a>(value: &str, candidates: impl Iterator<Item = &'a str>) -> u32 {
    candidates
        .map(|candidate| levenshtein(value, candidate))
        .min()
        .unwrap_or_else(|| value.chars().count() as u32)
}

/// Case-insensitive Levenshtein distance
pub fn levenshtein(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().flat_map(char::to_lowercase).collect();
    let b: Vec<char> = b.chars().flat_map(char::to_lowercase).collect();

    let mut previous: Vec<u32> = (0..=b.len() as u32).collect();
    let mut current = vec![0u32; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i as u32 + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + u32::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
