//! Arena geometry: wall segments, ray casting, and point-to-segment distance.
//!
//! All routines are total over reachable inputs; degenerate denominators in
//! the parametric intersection are reported as "no intersection" rather than
//! propagated as errors.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::Vec2;

/// An immutable wall segment with an outward normal.
///
/// Walls never change after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Wall {
    pub start: Vec2,
    pub end: Vec2,
    pub normal: Vec2,
}

impl Wall {
    /// Creates a wall segment.
    pub fn new(start: Vec2, end: Vec2, normal: Vec2) -> Self {
        Self { start, end, normal }
    }

    /// The four walls of a square arena with the given half-extent,
    /// normals pointing inward toward the vehicle.
    pub fn arena(half_extent: f64) -> [Wall; 4] {
        let h = half_extent;
        [
            Wall::new(Vec2::new(-h, -h), Vec2::new(h, -h), Vec2::new(0.0, 1.0)),
            Wall::new(Vec2::new(h, -h), Vec2::new(h, h), Vec2::new(-1.0, 0.0)),
            Wall::new(Vec2::new(h, h), Vec2::new(-h, h), Vec2::new(0.0, -1.0)),
            Wall::new(Vec2::new(-h, h), Vec2::new(-h, -h), Vec2::new(1.0, 0.0)),
        ]
    }

    /// Distance from a point to this segment.
    pub fn distance_to_point(&self, point: Vec2) -> f64 {
        point_segment_distance(point, self.start, self.end)
    }
}

/// Casts a ray from `origin` along the unit `direction` against the segment
/// `[start, end]` and returns the hit distance, if any.
///
/// Uses the parametric two-line intersection: the hit must lie within the
/// segment (`ua ∈ [0, 1]`) and ahead of the ray origin (`ub ≥ 0`). A ray
/// parallel to the segment yields `None`.
pub fn ray_segment_intersection(
    origin: Vec2,
    direction: Vec2,
    start: Vec2,
    end: Vec2,
) -> Option<f64> {
    let tip = origin + direction;

    let denominator =
        (tip.y - origin.y) * (end.x - start.x) - (tip.x - origin.x) * (end.y - start.y);
    if denominator == 0.0 {
        return None;
    }

    let ua = ((tip.x - origin.x) * (start.y - origin.y)
        - (tip.y - origin.y) * (start.x - origin.x))
        / denominator;
    if !(0.0..=1.0).contains(&ua) {
        return None;
    }

    let ub = ((end.x - start.x) * (start.y - origin.y)
        - (end.y - start.y) * (start.x - origin.x))
        / denominator;
    if ub < 0.0 {
        return None;
    }

    let hit = Vec2::new(
        start.x + ua * (end.x - start.x),
        start.y + ua * (end.y - start.y),
    );
    Some(origin.distance_to(&hit))
}

/// Distance from `point` to the segment `[start, end]`.
///
/// Projects the point onto the segment's supporting line and clamps the
/// projection parameter to the segment; a zero-length segment degenerates
/// to the distance to its single endpoint.
pub fn point_segment_distance(point: Vec2, start: Vec2, end: Vec2) -> f64 {
    let to_point = Vec2::new(point.x - start.x, point.y - start.y);
    let along = Vec2::new(end.x - start.x, end.y - start.y);

    let dot = to_point.x * along.x + to_point.y * along.y;
    let len_sq = along.x * along.x + along.y * along.y;
    let param = if len_sq != 0.0 { dot / len_sq } else { -1.0 };

    let closest = if param < 0.0 {
        start
    } else if param > 1.0 {
        end
    } else {
        Vec2::new(start.x + param * along.x, start.y + param * along.y)
    };

    point.distance_to(&closest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_walls_form_square() {
        let walls = Wall::arena(10.0);
        assert_eq!(walls.len(), 4);
        // Consecutive walls share endpoints.
        for i in 0..4 {
            let next = walls[(i + 1) % 4];
            assert_eq!(walls[i].end, next.start);
        }
    }

    #[test]
    fn ray_hits_perpendicular_wall() {
        // Ray from origin pointing +y, wall at y = 10.
        let d = ray_segment_intersection(
            Vec2::origin(),
            Vec2::new(0.0, 1.0),
            Vec2::new(-10.0, 10.0),
            Vec2::new(10.0, 10.0),
        );
        assert!((d.unwrap() - 10.0).abs() < 1e-10);
    }

    #[test]
    fn ray_parallel_to_wall_misses() {
        // Ray along +x, wall also along x at y = 10: denominator is zero.
        let d = ray_segment_intersection(
            Vec2::origin(),
            Vec2::new(1.0, 0.0),
            Vec2::new(-10.0, 10.0),
            Vec2::new(10.0, 10.0),
        );
        assert!(d.is_none());
    }

    #[test]
    fn ray_behind_origin_misses() {
        // Wall behind the ray direction.
        let d = ray_segment_intersection(
            Vec2::origin(),
            Vec2::new(0.0, 1.0),
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
        );
        assert!(d.is_none());
    }

    #[test]
    fn ray_outside_segment_extent_misses() {
        // Supporting line intersects, but beyond the segment end.
        let d = ray_segment_intersection(
            Vec2::origin(),
            Vec2::new(0.0, 1.0),
            Vec2::new(5.0, 10.0),
            Vec2::new(10.0, 10.0),
        );
        assert!(d.is_none());
    }

    #[test]
    fn diagonal_ray_distance() {
        // 45° ray into the corner of two walls at distance 10/cos(45°).
        let dir = Vec2::from_heading(std::f64::consts::FRAC_PI_4);
        let d = ray_segment_intersection(
            Vec2::origin(),
            dir,
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 10.0),
        )
        .unwrap();
        assert!((d - 10.0 * 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn point_distance_to_segment_interior() {
        let d = point_segment_distance(
            Vec2::new(0.0, 3.0),
            Vec2::new(-5.0, 0.0),
            Vec2::new(5.0, 0.0),
        );
        assert!((d - 3.0).abs() < 1e-10);
    }

    #[test]
    fn point_distance_clamps_to_endpoint() {
        let d = point_segment_distance(
            Vec2::new(8.0, 4.0),
            Vec2::new(-5.0, 0.0),
            Vec2::new(5.0, 0.0),
        );
        assert!((d - 5.0) < 1e-10);
        assert!((d - (9.0 + 16.0f64).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn zero_length_segment_degenerates_to_point() {
        let p = Vec2::new(1.0, 1.0);
        let d = point_segment_distance(Vec2::new(4.0, 5.0), p, p);
        assert!((d - 5.0).abs() < 1e-10);
    }
}
