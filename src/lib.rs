//! Floorstack - procedural floor-stack designer for building interiors.

pub mod error;
pub mod procgen;
