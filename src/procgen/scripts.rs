//! Tag sets, script lookup and weighted tag selection.
//!
//! Floors and vertical elements never name a script directly. They list
//! weighted tag sets, and the host's [`ScriptLibrary`] turns a tag set into a
//! concrete script.

use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::context::DesignContext;
use crate::error::{DesignError, DesignResult};

/// Ordered, de-duplicated set of tags.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet {
    tags: SmallVec<[String; 4]>,
}

impl TagSet {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: SmallVec<[String; 4]> = tags.into_iter().map(Into::into).collect();
        tags.sort();
        tags.dedup();
        Self { tags }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.binary_search_by(|t| t.as_str().cmp(tag)).is_ok()
    }

    /// True when every tag in `self` is also in `other`.
    pub fn is_subset_of(&self, other: &TagSet) -> bool {
        self.tags.iter().all(|t| other.contains(t))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl From<Vec<String>> for TagSet {
    fn from(tags: Vec<String>) -> Self {
        Self::new(tags)
    }
}

impl From<TagSet> for Vec<String> {
    fn from(set: TagSet) -> Self {
        set.tags.into_vec()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.tags.join(","))
    }
}

/// Opaque handle to a floor or vertical-element script owned by the host.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(pub String);

impl ScriptId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves a tag set to a script. Must be a pure function of its input for
/// designs to be reproducible.
pub trait ScriptLibrary {
    fn find(&self, tags: &TagSet) -> Option<ScriptId>;
}

impl<F> ScriptLibrary for F
where
    F: Fn(&TagSet) -> Option<ScriptId>,
{
    fn find(&self, tags: &TagSet) -> Option<ScriptId> {
        self(tags)
    }
}

/// Script registry where each script advertises the tags it satisfies.
#[derive(Resource, Clone, Debug, Default)]
pub struct TaggedScripts {
    scripts: Vec<(ScriptId, TagSet)>,
}

impl TaggedScripts {
    pub fn register(&mut self, script: ScriptId, tags: TagSet) {
        self.scripts.push((script, tags));
    }

    pub fn with(mut self, script: &str, tags: &[&str]) -> Self {
        self.register(ScriptId::new(script), TagSet::new(tags.iter().copied()));
        self
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl ScriptLibrary for TaggedScripts {
    /// First registered script whose tags include every requested tag.
    fn find(&self, tags: &TagSet) -> Option<ScriptId> {
        self.scripts
            .iter()
            .find(|(_, provided)| tags.is_subset_of(provided))
            .map(|(script, _)| script.clone())
    }
}

/// One weighted option. `tags: None` is a deliberate "nothing here" choice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagCandidate {
    pub weight: f32,
    #[serde(default)]
    pub tags: Option<TagSet>,
}

impl TagCandidate {
    pub fn new(weight: f32, tags: &[&str]) -> Self {
        Self {
            weight,
            tags: Some(TagSet::new(tags.iter().copied())),
        }
    }

    pub fn nothing(weight: f32) -> Self {
        Self { weight, tags: None }
    }
}

/// Weighted list of tag sets drawn from when choosing a script.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedTags {
    pub candidates: Vec<TagCandidate>,
}

impl WeightedTags {
    pub fn new(candidates: Vec<TagCandidate>) -> Self {
        Self { candidates }
    }

    /// Always select the same tag set.
    pub fn single(tags: &[&str]) -> Self {
        Self::new(vec![TagCandidate::new(1.0, tags)])
    }

    /// Draw candidates by weight until one resolves to a script.
    ///
    /// A drawn `None` candidate returns `Ok(None)` immediately. A tag set the
    /// library cannot resolve is removed together with every duplicate of it
    /// before the next draw. Running out of candidates is a selection failure.
    pub fn select(&self, ctx: &mut DesignContext) -> DesignResult<Option<(ScriptId, TagSet)>> {
        let mut remaining: Vec<&TagCandidate> = self.candidates.iter().collect();

        while !remaining.is_empty() {
            let chosen = draw_weighted(&remaining, ctx);
            let Some(tags) = remaining[chosen].tags.clone() else {
                return Ok(None);
            };

            if let Some(script) = ctx.scripts.find(&tags) {
                return Ok(Some((script, tags)));
            }

            trace!("No script for tags {tags}, dropping candidate");
            remaining.retain(|c| c.tags.as_ref() != Some(&tags));
        }

        Err(DesignError::SelectionFailed {
            candidates: self.candidates.len(),
        })
    }

    pub fn validate(&self, what: &str) -> DesignResult<()> {
        if self.candidates.is_empty() {
            return Err(DesignError::malformed(format!("{what}: no tag candidates")));
        }
        if let Some(bad) = self
            .candidates
            .iter()
            .find(|c| !c.weight.is_finite() || c.weight < 0.0)
        {
            return Err(DesignError::malformed(format!(
                "{what}: invalid weight {}",
                bad.weight
            )));
        }
        Ok(())
    }
}

fn draw_weighted(candidates: &[&TagCandidate], ctx: &mut DesignContext) -> usize {
    let total: f32 = candidates.iter().map(|c| c.weight).sum();
    if total <= 0.0 {
        return 0;
    }

    let mut choice = ctx.random() * total;
    for (i, candidate) in candidates.iter().enumerate() {
        choice -= candidate.weight;
        if choice < 0.0 {
            return i;
        }
    }

    // Float rounding can leave a sliver past the last weight.
    candidates.len() - 1
}
