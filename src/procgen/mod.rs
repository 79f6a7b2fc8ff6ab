//! Procedural floor-stack generation.
//!
//! - Value generators and weighted tag selection
//! - Floor selectors flattened into an indexed stack
//! - Footprint algorithms applied at marker floors
//! - Floor references and vertical elements spanning the stack

use bevy::prelude::*;

pub mod building_factory;
pub mod context;
pub mod designer;
pub mod floors;
pub mod footprint;
pub mod lot_geometry;
pub mod metadata;
pub mod refs;
pub mod scripts;
pub mod values;
pub mod verticals;

pub struct ProcgenPlugin;

impl Plugin for ProcgenPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(building_factory::BuildingFactoryPlugin);
    }
}
