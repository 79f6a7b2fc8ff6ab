//! Footprint algorithm chains.
//!
//! A marker carries a chain that reshapes the footprint inherited from the
//! floor nearer the ground. Every algorithm sees the running polygon, the
//! fixed basis the chain started from, and the fixed lot.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::context::DesignContext;
use super::lot_geometry::{
    clip_polygon, corner_angle, interior_angle, is_convex_corner, lot_centroid, reduce_corners,
    rotate_polygon, shrink_polygon,
};
use super::metadata::MetaValue;
use super::values::ValueGenerator;
use crate::error::{DesignError, DesignResult};

/// Triangle area under which a vertex counts as collinear with its
/// neighbours: roughly a 2 degree kink between two 2 m edges.
pub const CORNER_REDUCTION_AREA: f32 = 0.07;

fn default_corner_angle() -> f32 {
    90.0
}

/// Which corners a [`FootprintAlgorithm::InvertCorner`] notches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerKind {
    #[default]
    Convex,
    Concave,
}

/// Polygon a [`FootprintAlgorithm::Clip`] intersects with.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipTarget {
    #[default]
    Lot,
    Basis,
}

/// Typed value written by [`FootprintAlgorithm::MetaSet`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaSetValue {
    Float(ValueGenerator),
    Int(ValueGenerator),
    Bool(bool),
    Text(String),
}

/// One step in a footprint chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FootprintAlgorithm {
    Identity,
    /// Reserved for a host step that fills leftover lot space.
    FillSpace,
    /// Cut corners with an interior angle at or below `angle` degrees.
    Bevel {
        #[serde(default = "default_corner_angle")]
        angle: f32,
        distance: ValueGenerator,
    },
    /// Push a square notch into matching corners.
    InvertCorner {
        #[serde(default = "default_corner_angle")]
        angle: f32,
        distance: ValueGenerator,
        #[serde(default)]
        min_distance: f32,
        #[serde(default)]
        corners: CornerKind,
    },
    Shrink {
        distance: ValueGenerator,
    },
    /// Rotate about the centroid by a drawn angle in degrees.
    Twist {
        angle: ValueGenerator,
    },
    Clip {
        #[serde(default)]
        against: ClipTarget,
    },
    MetaSet {
        key: String,
        value: MetaSetValue,
    },
}

impl FootprintAlgorithm {
    pub fn apply(
        &self,
        ctx: &mut DesignContext,
        current: &[Vec2],
        basis: &[Vec2],
        lot: &[Vec2],
    ) -> DesignResult<Vec<Vec2>> {
        if current.len() < 3 {
            return Ok(current.to_vec());
        }

        match self {
            FootprintAlgorithm::Identity | FootprintAlgorithm::FillSpace => Ok(current.to_vec()),
            FootprintAlgorithm::Bevel { angle, distance } => {
                let distance = distance.select_float(ctx)?;
                Ok(bevel_corners(current, *angle, distance))
            }
            FootprintAlgorithm::InvertCorner {
                angle,
                distance,
                min_distance,
                corners,
            } => {
                let distance = distance.select_float(ctx)?;
                Ok(invert_corners(
                    current,
                    *angle,
                    distance,
                    *min_distance,
                    *corners,
                ))
            }
            FootprintAlgorithm::Shrink { distance } => {
                let distance = distance.select_float(ctx)?;
                Ok(shrink_polygon(current, distance))
            }
            FootprintAlgorithm::Twist { angle } => {
                let degrees = angle.select_float(ctx)?;
                Ok(rotate_polygon(current, lot_centroid(current), degrees.to_radians()))
            }
            FootprintAlgorithm::Clip { against } => {
                let target = match against {
                    ClipTarget::Lot => lot,
                    ClipTarget::Basis => basis,
                };
                Ok(clip_polygon(current, target))
            }
            FootprintAlgorithm::MetaSet { key, value } => {
                let value = match value {
                    MetaSetValue::Float(generator) => {
                        MetaValue::Float(generator.select_float(ctx)?)
                    }
                    MetaSetValue::Int(generator) => MetaValue::Int(generator.select_int(ctx)?),
                    MetaSetValue::Bool(flag) => MetaValue::Bool(*flag),
                    MetaSetValue::Text(text) => MetaValue::Text(text.clone()),
                };
                ctx.metadata.set(key.clone(), value);
                Ok(current.to_vec())
            }
        }
    }

    pub fn validate(&self, what: &str) -> DesignResult<()> {
        match self {
            FootprintAlgorithm::Identity
            | FootprintAlgorithm::FillSpace
            | FootprintAlgorithm::Clip { .. } => Ok(()),
            FootprintAlgorithm::Bevel { distance, .. }
            | FootprintAlgorithm::Shrink { distance } => {
                distance.validate(what)?;
                non_negative(distance, what)
            }
            FootprintAlgorithm::InvertCorner {
                distance,
                min_distance,
                ..
            } => {
                distance.validate(what)?;
                non_negative(distance, what)?;
                if *min_distance < 0.0 {
                    return Err(DesignError::malformed(format!(
                        "{what}: negative minimum distance"
                    )));
                }
                Ok(())
            }
            FootprintAlgorithm::Twist { angle } => angle.validate(what),
            FootprintAlgorithm::MetaSet { key, value } => {
                if key.is_empty() {
                    return Err(DesignError::malformed(format!("{what}: meta key is empty")));
                }
                match value {
                    MetaSetValue::Float(generator) | MetaSetValue::Int(generator) => {
                        generator.validate(what)
                    }
                    MetaSetValue::Bool(_) | MetaSetValue::Text(_) => Ok(()),
                }
            }
        }
    }
}

fn non_negative(distance: &ValueGenerator, what: &str) -> DesignResult<()> {
    if distance.min_value() < 0.0 {
        return Err(DesignError::malformed(format!("{what}: negative distance")));
    }
    Ok(())
}

/// An ordered list of footprint algorithms.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FootprintChain {
    pub algorithms: Vec<FootprintAlgorithm>,
}

impl FootprintChain {
    pub fn new(algorithms: Vec<FootprintAlgorithm>) -> Self {
        Self { algorithms }
    }

    /// Run every algorithm in order, reducing corners after each step.
    pub fn apply(
        &self,
        ctx: &mut DesignContext,
        current: &[Vec2],
        basis: &[Vec2],
        lot: &[Vec2],
    ) -> DesignResult<Vec<Vec2>> {
        let mut polygon = current.to_vec();
        for algorithm in &self.algorithms {
            polygon = algorithm.apply(ctx, &polygon, basis, lot)?;
            polygon = reduce_corners(&polygon, CORNER_REDUCTION_AREA);
        }
        Ok(polygon)
    }

    pub fn validate(&self, what: &str) -> DesignResult<()> {
        self.algorithms.iter().try_for_each(|a| a.validate(what))
    }
}

fn corner_geometry(vertices: &[Vec2], i: usize) -> (Vec2, Vec2, Vec2, f32) {
    let n = vertices.len();
    let cur = vertices[i];
    let prev = vertices[(i + n - 1) % n];
    let next = vertices[(i + 1) % n];
    let half_shorter = 0.5 * prev.distance(cur).min(next.distance(cur));
    (
        cur,
        (prev - cur).normalize_or_zero(),
        (next - cur).normalize_or_zero(),
        half_shorter,
    )
}

/// Replace sharp corners with a flat cut `distance` back along each edge.
pub fn bevel_corners(vertices: &[Vec2], angle: f32, distance: f32) -> Vec<Vec2> {
    let mut result = Vec::with_capacity(vertices.len() * 2);

    for i in 0..vertices.len() {
        let (cur, to_prev, to_next, half_shorter) = corner_geometry(vertices, i);
        let cut = distance.min(half_shorter);

        if cut <= 0.0 || interior_angle(vertices, i) > angle + 1e-3 {
            result.push(cur);
            continue;
        }

        result.push(cur + to_prev * cut);
        result.push(cur + to_next * cut);
    }

    result
}

/// Mirror matching corners through a square of side `distance`.
///
/// A convex corner gets the square cut out of it. A reflex corner gets the
/// square filled in, turning it into a convex step.
pub fn invert_corners(
    vertices: &[Vec2],
    angle: f32,
    distance: f32,
    min_distance: f32,
    corners: CornerKind,
) -> Vec<Vec2> {
    let mut result = Vec::with_capacity(vertices.len() * 3);

    for i in 0..vertices.len() {
        let (cur, to_prev, to_next, half_shorter) = corner_geometry(vertices, i);
        let cut = distance.min(half_shorter);
        let kind = if is_convex_corner(vertices, i) {
            CornerKind::Convex
        } else {
            CornerKind::Concave
        };

        if kind != corners
            || cut <= 0.0
            || cut < min_distance
            || corner_angle(vertices, i) > angle + 1e-3
        {
            result.push(cur);
            continue;
        }

        result.push(cur + to_prev * cut);
        result.push(cur + (to_prev + to_next) * cut);
        result.push(cur + to_next * cut);
    }

    result
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::procgen::lot_geometry::polygon_area;
    use crate::procgen::metadata::Metadata;
    use crate::procgen::scripts::TaggedScripts;

    fn square(side: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(side, 0.0),
            Vec2::new(side, side),
            Vec2::new(0.0, side),
        ]
    }

    fn run(chain: &FootprintChain, polygon: &[Vec2], lot: &[Vec2]) -> (Vec<Vec2>, Metadata) {
        let mut rng = StdRng::seed_from_u64(17);
        let mut meta = Metadata::new();
        let scripts = TaggedScripts::default();
        let result = {
            let mut ctx = DesignContext::new(&mut rng, &mut meta, &scripts);
            chain.apply(&mut ctx, polygon, polygon, lot).unwrap()
        };
        (result, meta)
    }

    #[test]
    fn shrink_square_area() {
        let chain = FootprintChain::new(vec![FootprintAlgorithm::Shrink {
            distance: ValueGenerator::constant(1.0),
        }]);
        let lot = square(10.0);
        let (result, _) = run(&chain, &lot, &lot);
        assert!((polygon_area(&result) - 64.0).abs() < 1e-3);
    }

    #[test]
    fn bevel_square_removes_corner_triangles() {
        let chain = FootprintChain::new(vec![FootprintAlgorithm::Bevel {
            angle: 90.0,
            distance: ValueGenerator::constant(1.0),
        }]);
        let lot = square(10.0);
        let (result, _) = run(&chain, &lot, &lot);
        assert_eq!(result.len(), 8);
        assert!((polygon_area(&result) - (100.0 - 4.0 * 0.5)).abs() < 1e-3);
    }

    #[test]
    fn bevel_distance_is_clamped_to_half_edge() {
        let result = bevel_corners(&square(2.0), 90.0, 5.0);
        // Cutting 1 m from every corner of a 2 m square leaves a diamond.
        assert!((polygon_area(&result) - 2.0).abs() < 1e-3);
    }

    #[test]
    fn bevel_skips_wide_corners() {
        let result = bevel_corners(&square(10.0), 60.0, 1.0);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn invert_corner_notches_convex_corners() {
        let result = invert_corners(&square(10.0), 90.0, 1.0, 0.0, CornerKind::Convex);
        assert_eq!(result.len(), 12);
        assert!((polygon_area(&result) - 96.0).abs() < 1e-3);
    }

    #[test]
    fn invert_corner_respects_minimum_and_kind() {
        let below_min = invert_corners(&square(10.0), 90.0, 1.0, 2.0, CornerKind::Convex);
        assert_eq!(below_min.len(), 4);

        let concave_only = invert_corners(&square(10.0), 90.0, 1.0, 0.0, CornerKind::Concave);
        assert_eq!(concave_only.len(), 4);
    }

    #[test]
    fn twist_then_clip_stays_inside_lot() {
        let chain = FootprintChain::new(vec![
            FootprintAlgorithm::Twist {
                angle: ValueGenerator::constant(45.0),
            },
            FootprintAlgorithm::Clip {
                against: ClipTarget::Lot,
            },
        ]);
        let lot = square(10.0);
        let (result, _) = run(&chain, &lot, &lot);
        assert!(polygon_area(&result) < 100.0);
        assert!(polygon_area(&result) > 50.0);
        assert!(crate::procgen::lot_geometry::is_clockwise(&result));
    }

    fn l_shape() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 5.0),
            Vec2::new(5.0, 5.0),
            Vec2::new(5.0, 10.0),
            Vec2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn invert_corner_fills_reflex_corner() {
        let result = invert_corners(&l_shape(), 90.0, 1.0, 0.0, CornerKind::Concave);
        assert_eq!(
            result,
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(10.0, 0.0),
                Vec2::new(10.0, 5.0),
                Vec2::new(6.0, 5.0),
                Vec2::new(6.0, 6.0),
                Vec2::new(5.0, 6.0),
                Vec2::new(5.0, 10.0),
                Vec2::new(0.0, 10.0),
            ]
        );
        assert!((polygon_area(&result) - 76.0).abs() < 1e-3);
    }

    #[test]
    fn invert_corner_on_l_shape_skips_reflex_corner_when_convex() {
        let result = invert_corners(&l_shape(), 90.0, 1.0, 0.0, CornerKind::Convex);
        assert_eq!(result.len(), 6 + 5 * 2);
        assert!(result.contains(&Vec2::new(5.0, 5.0)));
        assert!((polygon_area(&result) - 70.0).abs() < 1e-3);
    }

    #[test]
    fn clip_against_notched_basis() {
        let lot = square(10.0);
        let basis = invert_corners(&lot, 90.0, 2.0, 0.0, CornerKind::Convex);
        let chain = FootprintChain::new(vec![FootprintAlgorithm::Clip {
            against: ClipTarget::Basis,
        }]);

        let mut rng = StdRng::seed_from_u64(5);
        let mut meta = Metadata::new();
        let scripts = TaggedScripts::default();
        let mut ctx = DesignContext::new(&mut rng, &mut meta, &scripts);
        let result = chain.apply(&mut ctx, &lot, &basis, &lot).unwrap();

        // Every corner loses a 2 m square.
        assert!((polygon_area(&result) - 84.0).abs() < 1e-2);
        assert_eq!(result.len(), 12);
    }

    #[test]
    fn meta_set_passes_polygon_through() {
        let chain = FootprintChain::new(vec![FootprintAlgorithm::MetaSet {
            key: "setback".into(),
            value: MetaSetValue::Float(ValueGenerator::constant(2.5)),
        }]);
        let lot = square(10.0);
        let (result, meta) = run(&chain, &lot, &lot);
        assert_eq!(result, lot);
        assert_eq!(meta.get_float("setback"), Some(2.5));
    }

    #[test]
    fn meta_set_writes_flags_and_text() {
        let chain = FootprintChain::new(vec![
            FootprintAlgorithm::MetaSet {
                key: "podium".into(),
                value: MetaSetValue::Bool(true),
            },
            FootprintAlgorithm::MetaSet {
                key: "podium".into(),
                value: MetaSetValue::Text("glazed".into()),
            },
        ]);
        let lot = square(10.0);
        let (_, meta) = run(&chain, &lot, &lot);
        assert_eq!(meta.get_bool("podium"), Some(true));
        assert_eq!(meta.get_text("podium"), Some("glazed"));
    }

    #[test]
    fn degenerate_polygons_pass_through() {
        let chain = FootprintChain::new(vec![FootprintAlgorithm::Shrink {
            distance: ValueGenerator::constant(1.0),
        }]);
        let line = vec![Vec2::ZERO, Vec2::X];
        let (result, _) = run(&chain, &line, &square(10.0));
        assert_eq!(result, line);
    }

    #[test]
    fn deserializes_chain() {
        let chain: FootprintChain = serde_json::from_str(
            r#"[
                {"type": "shrink", "distance": {"type": "constant", "value": 1.0}},
                {"type": "clip", "against": "basis"},
                {"type": "fill_space"}
            ]"#,
        )
        .unwrap();
        assert_eq!(chain.algorithms.len(), 3);
    }
}
