//! Floor and run selectors.
//!
//! Selectors run in document order, bottom of the building first, and each
//! produces a list of [`FloorRun`]s. Indices are assigned later, when the
//! designer flattens the runs into a stack.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context::DesignContext;
use super::footprint::FootprintChain;
use super::scripts::{ScriptId, TagSet, WeightedTags};
use super::values::ValueGenerator;
use crate::error::{DesignError, DesignResult};

/// One concrete floor in a building.
#[derive(Clone, Debug, PartialEq)]
pub struct FloorSelection {
    pub id: String,
    pub tags: TagSet,
    pub script: ScriptId,
    pub height: f32,
    /// 0 is the ground floor, negative indices are basements.
    pub index: i32,
}

impl FloorSelection {
    pub fn new(id: impl Into<String>, tags: TagSet, script: ScriptId, height: f32) -> Self {
        Self {
            id: id.into(),
            tags,
            script,
            height,
            index: 0,
        }
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }
}

/// Ground or footprint marker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MarkerKind {
    Ground,
    Footprint,
}

/// Zero-height pseudo-floor carrying a footprint chain.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MarkerSpec {
    #[serde(default)]
    pub footprint: FootprintChain,
}

/// A marker placed in a run.
#[derive(Clone, Debug)]
pub struct Marker {
    pub kind: MarkerKind,
    pub spec: Arc<MarkerSpec>,
}

/// Floors that stay contiguous in the final stack.
#[derive(Clone, Debug, Default)]
pub struct FloorRun {
    pub marker: Option<Marker>,
    pub floors: Vec<FloorSelection>,
}

impl FloorRun {
    pub fn of(floors: Vec<FloorSelection>) -> Self {
        Self {
            marker: None,
            floors,
        }
    }

    pub fn marker(marker: Marker) -> Self {
        Self {
            marker: Some(marker),
            floors: Vec::new(),
        }
    }

    pub fn is_ground(&self) -> bool {
        matches!(
            self.marker,
            Some(Marker {
                kind: MarkerKind::Ground,
                ..
            })
        )
    }
}

fn default_true() -> bool {
    true
}

/// A single floor drawn from weighted tags.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FloorSpec {
    pub id: String,
    pub tags: WeightedTags,
    pub height: ValueGenerator,
}

impl FloorSpec {
    pub fn new(id: impl Into<String>, tags: WeightedTags, height: ValueGenerator) -> Self {
        Self {
            id: id.into(),
            tags,
            height,
        }
    }

    pub fn select(&self, ctx: &mut DesignContext) -> DesignResult<Vec<FloorRun>> {
        let floors = draw_floor(&self.id, &self.tags, &self.height, ctx)?
            .into_iter()
            .collect();
        Ok(vec![FloorRun::of(floors)])
    }
}

/// One include of a [`FloorRangeSpec`]: `count` floors of the same kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RangeInclude {
    pub id: String,
    pub tags: WeightedTags,
    pub height: ValueGenerator,
    pub count: ValueGenerator,
    /// Draw every floor independently instead of cloning one draw.
    #[serde(default = "default_true")]
    pub vary: bool,
    /// Keep the include's floors together in one run.
    #[serde(default = "default_true")]
    pub continuous: bool,
}

impl RangeInclude {
    pub fn new(
        id: impl Into<String>,
        tags: WeightedTags,
        height: ValueGenerator,
        count: ValueGenerator,
    ) -> Self {
        Self {
            id: id.into(),
            tags,
            height,
            count,
            vary: true,
            continuous: true,
        }
    }

    pub fn with_vary(mut self, vary: bool) -> Self {
        self.vary = vary;
        self
    }

    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    pub fn select(&self, ctx: &mut DesignContext) -> DesignResult<Vec<FloorRun>> {
        let count = self.count.select_int(ctx)?.max(0) as usize;

        // Draws that come back empty are dropped, shifting later floors down.
        let mut floors = Vec::with_capacity(count);
        if self.vary {
            for _ in 0..count {
                if let Some(floor) = draw_floor(&self.id, &self.tags, &self.height, ctx)? {
                    floors.push(floor);
                }
            }
        } else if count > 0 {
            if let Some(floor) = draw_floor(&self.id, &self.tags, &self.height, ctx)? {
                floors.resize(count, floor);
            }
        }

        if self.continuous {
            Ok(vec![FloorRun::of(floors)])
        } else {
            Ok(floors.into_iter().map(|f| FloorRun::of(vec![f])).collect())
        }
    }
}

/// Several includes whose runs are shuffled together.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FloorRangeSpec {
    pub includes: Vec<RangeInclude>,
}

impl FloorRangeSpec {
    pub fn new(includes: Vec<RangeInclude>) -> Self {
        Self { includes }
    }

    pub fn select(&self, ctx: &mut DesignContext) -> DesignResult<Vec<FloorRun>> {
        let mut runs = Vec::new();
        for include in &self.includes {
            runs.extend(include.select(ctx)?);
        }

        // Stable sort on one fresh key per run; ties keep include order.
        let mut keyed: Vec<(f32, FloorRun)> = runs.into_iter().map(|r| (ctx.random(), r)).collect();
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        Ok(keyed.into_iter().map(|(_, run)| run).collect())
    }
}

/// Repeat a list of selectors a drawn number of times.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepeatSpec {
    pub count: ValueGenerator,
    /// Re-run the children for every repetition instead of replaying the
    /// first result.
    #[serde(default = "default_true")]
    pub vary: bool,
    pub items: Vec<FloorSelector>,
}

impl RepeatSpec {
    pub fn new(count: ValueGenerator, items: Vec<FloorSelector>) -> Self {
        Self {
            count,
            vary: true,
            items,
        }
    }

    pub fn with_vary(mut self, vary: bool) -> Self {
        self.vary = vary;
        self
    }

    pub fn select(&self, ctx: &mut DesignContext) -> DesignResult<Vec<FloorRun>> {
        let count = self.count.select_int(ctx)?.max(0) as usize;
        if count == 0 {
            return Ok(Vec::new());
        }

        if self.vary {
            let mut runs = Vec::new();
            for _ in 0..count {
                runs.extend(select_all(&self.items, ctx)?);
            }
            return Ok(runs);
        }

        let once = select_all(&self.items, ctx)?;
        Ok(std::iter::repeat(once).take(count).flatten().collect())
    }
}

/// Any node in the floor selector tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FloorSelector {
    Floor(FloorSpec),
    Range(FloorRangeSpec),
    Repeat(RepeatSpec),
    GroundMarker(Arc<MarkerSpec>),
    FootprintMarker(Arc<MarkerSpec>),
}

impl FloorSelector {
    pub fn ground(footprint: FootprintChain) -> Self {
        FloorSelector::GroundMarker(Arc::new(MarkerSpec { footprint }))
    }

    pub fn footprint(footprint: FootprintChain) -> Self {
        FloorSelector::FootprintMarker(Arc::new(MarkerSpec { footprint }))
    }

    pub fn select(&self, ctx: &mut DesignContext) -> DesignResult<Vec<FloorRun>> {
        match self {
            FloorSelector::Floor(spec) => spec.select(ctx),
            FloorSelector::Range(spec) => spec.select(ctx),
            FloorSelector::Repeat(spec) => spec.select(ctx),
            FloorSelector::GroundMarker(spec) => Ok(vec![FloorRun::marker(Marker {
                kind: MarkerKind::Ground,
                spec: spec.clone(),
            })]),
            FloorSelector::FootprintMarker(spec) => Ok(vec![FloorRun::marker(Marker {
                kind: MarkerKind::Footprint,
                spec: spec.clone(),
            })]),
        }
    }

    /// Check shape and count ground markers. `nested` is true inside a
    /// repeat, where a ground marker could be emitted more than once.
    pub fn validate(&self, nested: bool, grounds: &mut usize) -> DesignResult<()> {
        match self {
            FloorSelector::Floor(spec) => validate_floor(&spec.id, &spec.tags, &spec.height),
            FloorSelector::Range(spec) => spec.includes.iter().try_for_each(|include| {
                validate_floor(&include.id, &include.tags, &include.height)?;
                include.count.validate(&include.id)
            }),
            FloorSelector::Repeat(spec) => {
                spec.count.validate("repeat count")?;
                spec.items
                    .iter()
                    .try_for_each(|item| item.validate(true, grounds))
            }
            FloorSelector::GroundMarker(spec) => {
                if nested {
                    return Err(DesignError::malformed("ground marker inside a repeat"));
                }
                *grounds += 1;
                spec.footprint.validate("ground marker")
            }
            FloorSelector::FootprintMarker(spec) => spec.footprint.validate("footprint marker"),
        }
    }
}

/// Run selectors in order and concatenate their runs.
pub fn select_all(
    selectors: &[FloorSelector],
    ctx: &mut DesignContext,
) -> DesignResult<Vec<FloorRun>> {
    let mut runs = Vec::new();
    for selector in selectors {
        runs.extend(selector.select(ctx)?);
    }
    Ok(runs)
}

fn draw_floor(
    id: &str,
    tags: &WeightedTags,
    height: &ValueGenerator,
    ctx: &mut DesignContext,
) -> DesignResult<Option<FloorSelection>> {
    let Some((script, chosen)) = tags.select(ctx)? else {
        return Ok(None);
    };
    let height = height.select_float(ctx)?;
    Ok(Some(FloorSelection::new(id, chosen, script, height)))
}

fn validate_floor(id: &str, tags: &WeightedTags, height: &ValueGenerator) -> DesignResult<()> {
    tags.validate(id)?;
    height.validate(id)?;
    if height.min_value() <= 0.0 {
        return Err(DesignError::malformed(format!(
            "{id}: floor height must be positive"
        )));
    }
    Ok(())
}
