//! Reference algebra for locating floors in a finished stack.
//!
//! References search a floor slice ordered top to bottom (highest index
//! first). A search can start at a slice position and walk `Down` toward the
//! basement or `Up` toward the roof; the nearest floor comes first either way.
//! Ambiguous results are reduced by a [`FilterMode`].

use std::ptr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::floors::FloorSelection;
use super::scripts::TagSet;
use crate::error::{DesignError, DesignResult};

/// Reduction applied to an ambiguous set of matches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    All,
    First,
    Second,
    Last,
    Shortest,
    Longest,
    SingleOrNone,
    SingleOrFail,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDirection {
    #[default]
    Up,
    Down,
}

/// Compiled regular expression matched against floor ids.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdPattern(Regex);

impl IdPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn is_match(&self, id: &str) -> bool {
        self.0.is_match(id)
    }
}

impl TryFrom<String> for IdPattern {
    type Error = regex::Error;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Self::new(&pattern)
    }
}

impl From<IdPattern> for String {
    fn from(pattern: IdPattern) -> Self {
        pattern.0.as_str().to_string()
    }
}

/// What a reference looks for.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RefTarget {
    /// Floors with exactly this id.
    Id { id: String },
    /// Floors carrying every one of these tags.
    Tagged { tags: TagSet },
    /// Floors whose id matches the pattern.
    RegexId { pattern: IdPattern },
    /// The floor at this index.
    Num { index: i32 },
}

impl RefTarget {
    pub fn is_match(&self, floor: &FloorSelection) -> bool {
        match self {
            RefTarget::Id { id } => floor.id == *id,
            RefTarget::Tagged { tags } => tags.is_subset_of(&floor.tags),
            RefTarget::RegexId { pattern } => pattern.is_match(&floor.id),
            RefTarget::Num { index } => floor.index == *index,
        }
    }
}

/// A symbolic reference to zero or more floors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FloorRef {
    #[serde(flatten)]
    pub target: RefTarget,
    #[serde(default)]
    pub direction: SearchDirection,
    #[serde(default)]
    pub filter: FilterMode,
    /// Collapse overlapping pairs into groups and filter each group again.
    #[serde(default)]
    pub non_overlapping: bool,
    /// Allow a pair to start and end on the same floor.
    #[serde(default)]
    pub inclusive: bool,
}

/// A start floor matched with an end floor.
#[derive(Clone, Copy, Debug)]
pub struct FloorPair<'f> {
    pub start: &'f FloorSelection,
    pub end: &'f FloorSelection,
}

impl FloorPair<'_> {
    pub fn span(&self) -> i32 {
        (self.start.index - self.end.index).abs()
    }

    pub fn lowest(&self) -> i32 {
        self.start.index.min(self.end.index)
    }

    pub fn highest(&self) -> i32 {
        self.start.index.max(self.end.index)
    }

    /// Whether the two pairs' inclusive index spans share a floor.
    pub fn overlaps(&self, other: &FloorPair) -> bool {
        self.lowest().max(other.lowest()) <= self.highest().min(other.highest())
    }
}

impl FloorRef {
    pub fn new(target: RefTarget) -> Self {
        Self {
            target,
            direction: SearchDirection::default(),
            filter: FilterMode::default(),
            non_overlapping: false,
            inclusive: false,
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::new(RefTarget::Id { id: id.into() })
    }

    pub fn tagged(tags: &[&str]) -> Self {
        Self::new(RefTarget::Tagged {
            tags: TagSet::new(tags.iter().copied()),
        })
    }

    pub fn regex_id(pattern: &str) -> DesignResult<Self> {
        Ok(Self::new(RefTarget::RegexId {
            pattern: IdPattern::new(pattern)?,
        }))
    }

    pub fn num(index: i32) -> Self {
        Self::new(RefTarget::Num { index })
    }

    pub fn up(mut self) -> Self {
        self.direction = SearchDirection::Up;
        self
    }

    pub fn down(mut self) -> Self {
        self.direction = SearchDirection::Down;
        self
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn non_overlapping(mut self) -> Self {
        self.non_overlapping = true;
        self
    }

    pub fn inclusive(mut self) -> Self {
        self.inclusive = true;
        self
    }

    /// Slice positions in search order, nearest first.
    fn search_order(&self, len: usize, start: Option<usize>) -> Vec<usize> {
        if len == 0 {
            return Vec::new();
        }

        match (self.direction, start) {
            (SearchDirection::Down, Some(start)) => (start.min(len)..len).collect(),
            (SearchDirection::Down, None) => (0..len).collect(),
            (SearchDirection::Up, Some(start)) => (0..=start.min(len - 1)).rev().collect(),
            (SearchDirection::Up, None) => (0..len).rev().collect(),
        }
    }

    fn match_positions(&self, floors: &[FloorSelection], start: Option<usize>) -> Vec<usize> {
        self.search_order(floors.len(), start)
            .into_iter()
            .filter(|&p| self.target.is_match(&floors[p]))
            .collect()
    }

    /// Every matching floor, nearest to `start` first.
    pub fn matches<'f>(
        &self,
        floors: &'f [FloorSelection],
        start: Option<usize>,
    ) -> Vec<&'f FloorSelection> {
        self.match_positions(floors, start)
            .into_iter()
            .map(|p| &floors[p])
            .collect()
    }

    /// Matching floors reduced by this reference's filter.
    pub fn resolve<'f>(
        &self,
        floors: &'f [FloorSelection],
        start: Option<usize>,
    ) -> DesignResult<Vec<&'f FloorSelection>> {
        filter_by_mode(self.matches(floors, start), self.filter, |_| 0)
    }

    /// Pair every start floor with this reference's matches searched from it.
    ///
    /// Candidates are filtered once per start floor. When the reference is
    /// non-overlapping, the surviving pairs are grouped by shared floors and
    /// every group is filtered again.
    pub fn match_from<'f>(
        &self,
        floors: &'f [FloorSelection],
        starts: &[&'f FloorSelection],
    ) -> DesignResult<Vec<FloorPair<'f>>> {
        let mut pairs = Vec::new();

        for &start in starts {
            let Some(position) = position_of(floors, start) else {
                continue;
            };

            let candidates: Vec<FloorPair<'f>> = self
                .match_positions(floors, Some(position))
                .into_iter()
                .map(|p| FloorPair {
                    start,
                    end: &floors[p],
                })
                .filter(|pair| self.inclusive || pair.start.index != pair.end.index)
                .collect();

            pairs.extend(filter_by_mode(candidates, self.filter, FloorPair::span)?);
        }

        if !self.non_overlapping {
            return Ok(pairs);
        }

        let mut reduced = Vec::new();
        for group in group_overlapping(pairs) {
            reduced.extend(filter_by_mode(group, self.filter, FloorPair::span)?);
        }
        Ok(reduced)
    }
}

fn position_of(floors: &[FloorSelection], floor: &FloorSelection) -> Option<usize> {
    floors
        .iter()
        .position(|f| ptr::eq(f, floor))
        .or_else(|| floors.iter().position(|f| f.index == floor.index))
}

/// Reduce `items` according to `mode`. `span` measures an item for the
/// shortest/longest modes; the earliest item wins ties.
pub fn filter_by_mode<T>(
    mut items: Vec<T>,
    mode: FilterMode,
    span: impl Fn(&T) -> i32,
) -> DesignResult<Vec<T>> {
    match mode {
        FilterMode::All => Ok(items),
        FilterMode::First => {
            items.truncate(1);
            Ok(items)
        }
        FilterMode::Second => Ok(items.into_iter().nth(1).into_iter().collect()),
        FilterMode::Last => Ok(items.pop().into_iter().collect()),
        FilterMode::Shortest => Ok(extreme(items, span, |a, b| a < b)),
        FilterMode::Longest => Ok(extreme(items, span, |a, b| a > b)),
        FilterMode::SingleOrNone => {
            if items.len() != 1 {
                items.clear();
            }
            Ok(items)
        }
        FilterMode::SingleOrFail => {
            if items.len() == 1 {
                Ok(items)
            } else {
                Err(DesignError::AmbiguousReference {
                    matches: items.len(),
                })
            }
        }
    }
}

fn extreme<T>(
    items: Vec<T>,
    span: impl Fn(&T) -> i32,
    better: impl Fn(i32, i32) -> bool,
) -> Vec<T> {
    let mut best: Option<(i32, T)> = None;
    for item in items {
        let s = span(&item);
        if best.as_ref().map_or(true, |(b, _)| better(s, *b)) {
            best = Some((s, item));
        }
    }
    best.map(|(_, item)| item).into_iter().collect()
}

/// First-fit grouping: a pair joins the first group holding a pair it
/// overlaps, otherwise it starts a new group.
pub fn group_overlapping<'f>(pairs: Vec<FloorPair<'f>>) -> Vec<Vec<FloorPair<'f>>> {
    let mut groups: Vec<Vec<FloorPair<'f>>> = Vec::new();

    for pair in pairs {
        let existing = groups
            .iter()
            .position(|group| group.iter().any(|p| p.overlaps(&pair)));
        match existing {
            Some(i) => groups[i].push(pair),
            None => groups.push(vec![pair]),
        }
    }

    groups
}
