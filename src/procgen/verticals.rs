//! Vertical elements (lifts, stairwells, risers) spanning floor pairs.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::context::DesignContext;
use super::floors::FloorSelection;
use super::refs::FloorRef;
use super::scripts::{ScriptId, TagSet, WeightedTags};
use crate::error::DesignResult;

/// A shaft running from floors matched by `bottom` to floors matched by
/// `top`, searched from each bottom floor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerticalElementSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub tags: WeightedTags,
    pub bottom: FloorRef,
    pub top: FloorRef,
}

/// One placed vertical element.
#[derive(Clone, Debug, PartialEq)]
pub struct VerticalSelection {
    pub script: ScriptId,
    pub tags: TagSet,
    pub bottom: i32,
    pub top: i32,
}

impl VerticalSelection {
    pub fn floors(&self) -> i32 {
        self.top - self.bottom + 1
    }
}

impl VerticalElementSpec {
    pub fn new(tags: WeightedTags, bottom: FloorRef, top: FloorRef) -> Self {
        Self {
            id: None,
            tags,
            bottom,
            top,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(&self) -> &str {
        self.id.as_deref().unwrap_or("vertical")
    }

    /// Resolve every span for this element against a top-first stack.
    ///
    /// One script is drawn for the whole element, and only when at least one
    /// span resolved.
    pub fn select(
        &self,
        ctx: &mut DesignContext,
        floors: &[FloorSelection],
    ) -> DesignResult<Vec<VerticalSelection>> {
        let starts = self.bottom.resolve(floors, None)?;
        let pairs = self.top.match_from(floors, &starts)?;
        if pairs.is_empty() {
            debug!("Vertical element {} resolved no spans", self.name());
            return Ok(Vec::new());
        }

        let Some((script, tags)) = self.tags.select(ctx)? else {
            return Ok(Vec::new());
        };

        Ok(pairs
            .iter()
            .map(|pair| VerticalSelection {
                script: script.clone(),
                tags: tags.clone(),
                bottom: pair.lowest(),
                top: pair.highest(),
            })
            .collect())
    }

    pub fn validate(&self) -> DesignResult<()> {
        self.tags.validate(self.name())
    }
}
