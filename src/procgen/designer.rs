//! Floor-stack designer.
//!
//! Runs a [`BuildingSpec`] against one lot: selectors produce runs in
//! document order (bottom first), the runs are flattened into an indexed stack
//! split at the ground marker, markers reshape the footprint, and finally the
//! vertical elements are resolved against the finished stack.

use std::ops::RangeInclusive;
use std::sync::Arc;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::context::DesignContext;
use super::floors::{select_all, FloorRun, FloorSelection, FloorSelector, Marker, MarkerKind};
use super::verticals::{VerticalElementSpec, VerticalSelection};
use crate::error::{DesignError, DesignResult};

/// Declarative description of a building's vertical program.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BuildingSpec {
    /// Selectors in document order, lowest basement first.
    pub floors: Vec<FloorSelector>,
    #[serde(default)]
    pub verticals: Vec<VerticalElementSpec>,
}

impl BuildingSpec {
    /// Check the spec's shape before any random draw.
    pub fn validate(&self) -> DesignResult<()> {
        let mut grounds = 0;
        for selector in &self.floors {
            selector.validate(false, &mut grounds)?;
        }
        if grounds > 1 {
            return Err(DesignError::malformed(format!(
                "{grounds} ground markers, expected at most one"
            )));
        }
        self.verticals.iter().try_for_each(VerticalElementSpec::validate)
    }
}

/// Linear progress of one design.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DesignPhase {
    #[default]
    Idle,
    Selecting,
    Flattening,
    ResolvingVerticals,
    Done,
}

/// The footprint a marker produced and the floors that use it.
#[derive(Clone, Debug)]
pub struct Footprint {
    pub kind: MarkerKind,
    pub polygon: Vec<Vec2>,
    /// Indices of the floors using this footprint, if any.
    pub floors: Option<RangeInclusive<i32>>,
}

impl Footprint {
    fn new(kind: MarkerKind, polygon: Vec<Vec2>) -> Self {
        Self {
            kind,
            polygon,
            floors: None,
        }
    }

    fn cover(&mut self, index: i32) {
        self.floors = Some(match self.floors.take() {
            Some(range) => (*range.start()).min(index)..=(*range.end()).max(index),
            None => index..=index,
        });
    }
}

/// A finished building design.
#[derive(Clone, Debug, Default)]
pub struct BuildingDesign {
    /// Floors ordered top to bottom.
    pub floors: Vec<FloorSelection>,
    pub footprints: Vec<Footprint>,
    pub verticals: Vec<VerticalSelection>,
}

impl BuildingDesign {
    pub fn floor(&self, index: i32) -> Option<&FloorSelection> {
        self.floors.iter().find(|f| f.index == index)
    }

    /// Footprint polygon for the floor at `index`.
    pub fn footprint_of(&self, index: i32) -> Option<&[Vec2]> {
        self.footprints
            .iter()
            .find(|f| f.floors.as_ref().is_some_and(|r| r.contains(&index)))
            .map(|f| f.polygon.as_slice())
    }

    pub fn above_ground(&self) -> usize {
        self.floors.iter().filter(|f| f.index >= 0).count()
    }

    pub fn below_ground(&self) -> usize {
        self.floors.iter().filter(|f| f.index < 0).count()
    }

    /// Height from the ground floor's base to the roof.
    pub fn height_above_ground(&self) -> f32 {
        self.floors
            .iter()
            .filter(|f| f.index >= 0)
            .map(|f| f.height)
            .sum()
    }
}

/// Designs floor stacks from one validated spec.
pub struct FloorStackDesigner {
    spec: Arc<BuildingSpec>,
    phase: DesignPhase,
}

impl FloorStackDesigner {
    pub fn new(spec: Arc<BuildingSpec>) -> DesignResult<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            phase: DesignPhase::Idle,
        })
    }

    pub fn spec(&self) -> &BuildingSpec {
        &self.spec
    }

    /// Phase reached by the last design, which is where it stopped on failure.
    pub fn phase(&self) -> DesignPhase {
        self.phase
    }

    pub fn design(
        &mut self,
        ctx: &mut DesignContext,
        lot: &[Vec2],
    ) -> DesignResult<BuildingDesign> {
        self.enter(DesignPhase::Selecting);
        let runs = select_all(&self.spec.floors, ctx)?;

        self.enter(DesignPhase::Flattening);
        let (floors, footprints) = flatten(runs, ctx, lot)?;

        self.enter(DesignPhase::ResolvingVerticals);
        let mut verticals = Vec::new();
        for element in &self.spec.verticals {
            verticals.extend(element.select(ctx, &floors)?);
        }

        self.enter(DesignPhase::Done);
        debug!(
            "Designed {} floors, {} footprints, {} vertical elements",
            floors.len(),
            footprints.len(),
            verticals.len()
        );

        Ok(BuildingDesign {
            floors,
            footprints,
            verticals,
        })
    }

    fn enter(&mut self, phase: DesignPhase) {
        debug!("Floor stack design: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

/// Index the runs around the ground marker and compute marker footprints.
///
/// Returns floors top first and footprints in evaluation order: ground, then
/// upward, then downward.
fn flatten(
    runs: Vec<FloorRun>,
    ctx: &mut DesignContext,
    lot: &[Vec2],
) -> DesignResult<(Vec<FloorSelection>, Vec<Footprint>)> {
    let grounds: Vec<usize> = runs
        .iter()
        .enumerate()
        .filter(|(_, run)| run.is_ground())
        .map(|(i, _)| i)
        .collect();
    if grounds.len() > 1 {
        return Err(DesignError::malformed(format!(
            "{} ground markers in the selected runs",
            grounds.len()
        )));
    }

    let split = grounds.first().copied().unwrap_or(0);
    let mut runs = runs;
    let above = runs.split_off(split);
    let below = runs;

    let mut footprints = Vec::new();
    let mut stack = Vec::new();

    // Ground footprint, from the ground marker or the bare lot.
    let ground = match above.first().and_then(|run| run.marker.as_ref()) {
        Some(marker) if marker.kind == MarkerKind::Ground => {
            marker.spec.footprint.apply(ctx, lot, lot, lot)?
        }
        _ => lot.to_vec(),
    };
    footprints.push(Footprint::new(MarkerKind::Ground, ground));
    let ground_slot = 0;

    // Above ground: walk upward, each marker building on the one below.
    let mut slot = ground_slot;
    let mut index = 0;
    for run in above {
        if let Some(marker) = run.marker.as_ref().filter(|m| m.kind == MarkerKind::Footprint) {
            slot = push_footprint(&mut footprints, marker, slot, ctx, lot)?;
        }
        for mut floor in run.floors {
            floor.index = index;
            footprints[slot].cover(index);
            stack.push(floor);
            index += 1;
        }
    }
    stack.reverse();

    // Below ground: walk downward from the ground marker.
    let mut slot = ground_slot;
    let mut index = -1;
    for run in below.into_iter().rev() {
        if let Some(marker) = run.marker.as_ref() {
            slot = push_footprint(&mut footprints, marker, slot, ctx, lot)?;
        }
        for mut floor in run.floors.into_iter().rev() {
            floor.index = index;
            footprints[slot].cover(index);
            stack.push(floor);
            index -= 1;
        }
    }

    Ok((stack, footprints))
}

fn push_footprint(
    footprints: &mut Vec<Footprint>,
    marker: &Marker,
    from: usize,
    ctx: &mut DesignContext,
    lot: &[Vec2],
) -> DesignResult<usize> {
    let inherited = footprints[from].polygon.clone();
    let polygon = marker.spec.footprint.apply(ctx, &inherited, &inherited, lot)?;
    footprints.push(Footprint::new(marker.kind, polygon));
    Ok(footprints.len() - 1)
}
