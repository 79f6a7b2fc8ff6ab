//! Polygon helpers for lots and floor footprints.
//!
//! Polygons are closed rings of `Vec2` without a repeated last vertex.
//! Positive signed area means counter-clockwise winding.

use bevy::prelude::*;
use geo::BooleanOps;

const EPSILON: f32 = 1e-5;

/// Calculate the centroid of a lot polygon.
pub fn lot_centroid(vertices: &[Vec2]) -> Vec2 {
    if vertices.is_empty() {
        return Vec2::ZERO;
    }

    vertices.iter().copied().sum::<Vec2>() / vertices.len() as f32
}

/// Shoelace area, positive for counter-clockwise rings.
pub fn signed_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += vertices[i].perp_dot(vertices[j]);
    }

    area / 2.0
}

pub fn polygon_area(vertices: &[Vec2]) -> f32 {
    signed_area(vertices).abs()
}

pub fn is_clockwise(vertices: &[Vec2]) -> bool {
    signed_area(vertices) < 0.0
}

/// Return the ring with clockwise winding.
pub fn make_clockwise(mut vertices: Vec<Vec2>) -> Vec<Vec2> {
    if signed_area(&vertices) > 0.0 {
        vertices.reverse();
    }
    vertices
}

/// Axis-aligned bounds as `(min, max)`.
pub fn polygon_bounds(vertices: &[Vec2]) -> (Vec2, Vec2) {
    vertices.iter().fold(
        (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
        |(min, max), &v| (min.min(v), max.max(v)),
    )
}

fn bounds_overlap((a_min, a_max): (Vec2, Vec2), (b_min, b_max): (Vec2, Vec2)) -> bool {
    a_min.cmple(b_max).all() && b_min.cmple(a_max).all()
}

/// Signed area of the triangle `a, b, c`.
pub fn triangle_area(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a) / 2.0
}

/// Whether the vertex at `i` bulges outward for the ring's winding.
pub fn is_convex_corner(vertices: &[Vec2], i: usize) -> bool {
    let n = vertices.len();
    let prev = vertices[(i + n - 1) % n];
    let cur = vertices[i];
    let next = vertices[(i + 1) % n];
    let turn = (cur - prev).perp_dot(next - cur);
    turn * signed_area(vertices).signum() > 0.0
}

/// Angle in degrees between the two edges meeting at `i`, in `[0, 180]`.
pub fn corner_angle(vertices: &[Vec2], i: usize) -> f32 {
    let n = vertices.len();
    let cur = vertices[i];
    let to_prev = (vertices[(i + n - 1) % n] - cur).normalize_or_zero();
    let to_next = (vertices[(i + 1) % n] - cur).normalize_or_zero();
    to_prev.dot(to_next).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Interior angle in degrees at `i`, above 180 for reflex corners.
pub fn interior_angle(vertices: &[Vec2], i: usize) -> f32 {
    let angle = corner_angle(vertices, i);
    if is_convex_corner(vertices, i) {
        angle
    } else {
        360.0 - angle
    }
}

/// Offset every edge inward by `distance`, joining neighbours at mitred
/// corners. Returns an empty ring if the polygon collapses.
pub fn shrink_polygon(vertices: &[Vec2], distance: f32) -> Vec<Vec2> {
    let ring = dedup_ring(vertices);
    if ring.len() < 3 {
        return Vec::new();
    }

    let area = signed_area(&ring);
    let winding = area.signum();
    let n = ring.len();

    let offset_lines: Vec<(Vec2, Vec2)> = (0..n)
        .map(|i| {
            let a = ring[i];
            let dir = (ring[(i + 1) % n] - a).normalize_or_zero();
            let inward = dir.perp() * winding;
            (a + inward * distance, dir)
        })
        .collect();

    let shrunk: Vec<Vec2> = (0..n)
        .map(|i| {
            let (p1, d1) = offset_lines[(i + n - 1) % n];
            let (p2, d2) = offset_lines[i];
            line_intersection(p1, d1, p2, d2).unwrap_or(p2)
        })
        .collect();

    let shrunk_area = signed_area(&shrunk);
    if shrunk_area.abs() < EPSILON || shrunk_area.signum() != winding {
        return Vec::new();
    }

    shrunk
}

/// Rotate every vertex about `pivot`.
pub fn rotate_polygon(vertices: &[Vec2], pivot: Vec2, radians: f32) -> Vec<Vec2> {
    let rotation = Vec2::from_angle(radians);
    vertices
        .iter()
        .map(|&v| pivot + rotation.rotate(v - pivot))
        .collect()
}

/// Intersect `subject` with `clip`, returning a clockwise ring.
///
/// Either polygon may be concave. When the overlap falls apart into several
/// pieces only the largest is kept.
pub fn clip_polygon(subject: &[Vec2], clip: &[Vec2]) -> Vec<Vec2> {
    let subject = dedup_ring(subject);
    let clip = dedup_ring(clip);
    if subject.len() < 3 || clip.len() < 3 {
        return Vec::new();
    }
    if !bounds_overlap(polygon_bounds(&subject), polygon_bounds(&clip)) {
        return Vec::new();
    }

    let overlap = to_geo(&subject).intersection(&to_geo(&clip));
    let Some(largest) = overlap
        .0
        .iter()
        .map(|piece| {
            let ring: Vec<Vec2> = piece
                .exterior()
                .coords()
                .map(|c| Vec2::new(c.x, c.y))
                .collect();
            dedup_ring(&ring)
        })
        .filter(|ring| ring.len() >= 3)
        .max_by(|a, b| polygon_area(a).total_cmp(&polygon_area(b)))
    else {
        return Vec::new();
    };

    make_clockwise(largest)
}

fn to_geo(ring: &[Vec2]) -> geo::Polygon<f32> {
    let exterior: Vec<geo::Coord<f32>> = ring
        .iter()
        .map(|v| geo::Coord { x: v.x, y: v.y })
        .collect();
    geo::Polygon::new(geo::LineString::from(exterior), Vec::new())
}

/// Remove near-collinear vertices until none remain or only a triangle is
/// left. A vertex is dropped when the triangle it forms with its neighbours
/// has an area below `threshold`.
pub fn reduce_corners(vertices: &[Vec2], threshold: f32) -> Vec<Vec2> {
    let mut points = vertices.to_vec();

    while points.len() > 3 {
        let n = points.len();
        let flat = (0..n).find(|&i| {
            triangle_area(points[(i + n - 1) % n], points[i], points[(i + 1) % n]).abs()
                < threshold
        });

        match flat {
            Some(i) => {
                points.remove(i);
            }
            None => break,
        }
    }

    points
}

/// Drop consecutive duplicate vertices, including a closing duplicate.
fn dedup_ring(vertices: &[Vec2]) -> Vec<Vec2> {
    let mut ring: Vec<Vec2> = Vec::with_capacity(vertices.len());
    for &v in vertices {
        if ring.last().map_or(true, |last| last.distance_squared(v) > EPSILON * EPSILON) {
            ring.push(v);
        }
    }
    while ring.len() > 1 && ring[0].distance_squared(ring[ring.len() - 1]) <= EPSILON * EPSILON {
        ring.pop();
    }
    ring
}

fn line_intersection(p1: Vec2, d1: Vec2, p2: Vec2, d2: Vec2) -> Option<Vec2> {
    let denom = d1.perp_dot(d2);
    if denom.abs() < EPSILON {
        return None;
    }
    let t = (p2 - p1).perp_dot(d2) / denom;
    Some(p1 + d1 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(side, 0.0),
            Vec2::new(side, side),
            Vec2::new(0.0, side),
        ]
    }

    #[test]
    fn area_and_winding() {
        let ccw = square(4.0);
        assert!((signed_area(&ccw) - 16.0).abs() < 1e-4);
        assert!(!is_clockwise(&ccw));

        let cw = make_clockwise(ccw);
        assert!(is_clockwise(&cw));
        assert!((polygon_area(&cw) - 16.0).abs() < 1e-4);
    }

    #[test]
    fn shrink_is_a_true_offset() {
        for ring in [square(10.0), make_clockwise(square(10.0))] {
            let shrunk = shrink_polygon(&ring, 1.5);
            assert_eq!(shrunk.len(), 4);
            assert!((polygon_area(&shrunk) - 49.0).abs() < 1e-3);
        }
    }

    #[test]
    fn shrink_collapses_to_empty() {
        assert!(shrink_polygon(&square(2.0), 1.5).is_empty());
    }

    #[test]
    fn clip_keeps_overlap_only() {
        let shifted: Vec<Vec2> = square(4.0)
            .into_iter()
            .map(|v| v + Vec2::new(2.0, 2.0))
            .collect();
        let clipped = clip_polygon(&shifted, &square(4.0));
        assert!((polygon_area(&clipped) - 4.0).abs() < 1e-3);
        assert!(is_clockwise(&clipped));
    }

    fn l_shape(side: f32) -> Vec<Vec2> {
        let half = side / 2.0;
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(side, 0.0),
            Vec2::new(side, half),
            Vec2::new(half, half),
            Vec2::new(half, side),
            Vec2::new(0.0, side),
        ]
    }

    #[test]
    fn clip_against_concave_lot_keeps_both_arms() {
        let clipped = clip_polygon(&square(10.0), &l_shape(10.0));
        assert!((polygon_area(&clipped) - 75.0).abs() < 1e-2);
        assert!(is_clockwise(&clipped));
        // The upper arm of the L survives.
        assert!(clipped.iter().any(|v| v.distance(Vec2::new(0.0, 10.0)) < 1e-3));
    }

    #[test]
    fn clip_concave_subject_against_square() {
        let window: Vec<Vec2> = square(6.0)
            .into_iter()
            .map(|v| v + Vec2::new(2.0, 2.0))
            .collect();
        // The window covers the reflex corner: 36 minus the 3x3 missing quadrant.
        let clipped = clip_polygon(&l_shape(10.0), &window);
        assert!((polygon_area(&clipped) - 27.0).abs() < 1e-2);
    }

    #[test]
    fn clip_keeps_largest_piece() {
        // A U-shaped lot splits a bar crossing both prongs into two pieces.
        let u = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(7.0, 10.0),
            Vec2::new(7.0, 3.0),
            Vec2::new(4.0, 3.0),
            Vec2::new(4.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        let bar = vec![
            Vec2::new(-1.0, 5.0),
            Vec2::new(11.0, 5.0),
            Vec2::new(11.0, 7.0),
            Vec2::new(-1.0, 7.0),
        ];
        let clipped = clip_polygon(&bar, &u);
        assert!((polygon_area(&clipped) - 8.0).abs() < 1e-2);
        assert!(clipped.iter().all(|v| v.x <= 4.0 + 1e-3));
    }

    #[test]
    fn clip_rejects_disjoint_bounds() {
        let far: Vec<Vec2> = square(2.0)
            .into_iter()
            .map(|v| v + Vec2::new(20.0, 0.0))
            .collect();
        assert!(clip_polygon(&far, &square(4.0)).is_empty());

        let (min, max) = polygon_bounds(&l_shape(10.0));
        assert_eq!((min, max), (Vec2::ZERO, Vec2::splat(10.0)));
    }

    #[test]
    fn reduce_corners_drops_collinear_points() {
        let ring = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert_eq!(reduce_corners(&ring, 0.07).len(), 4);
    }

    #[test]
    fn corner_classification() {
        // L-shape, counter-clockwise, with one reflex corner at (2, 2).
        let ring = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 2.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(2.0, 4.0),
            Vec2::new(0.0, 4.0),
        ];
        assert!(is_convex_corner(&ring, 0));
        assert!(!is_convex_corner(&ring, 3));
        assert!((interior_angle(&ring, 0) - 90.0).abs() < 1e-3);
        assert!((interior_angle(&ring, 3) - 270.0).abs() < 1e-3);
    }

    #[test]
    fn rotation_preserves_area() {
        let ring = square(3.0);
        let rotated = rotate_polygon(&ring, lot_centroid(&ring), 0.7);
        assert!((polygon_area(&rotated) - 9.0).abs() < 1e-3);
    }
}
