//! Convex hull of a traced contour.

use imageproc::geometry;

use super::contour::Point;

/// Hull vertices of `points`. Duplicates are dropped first; fewer than three
/// distinct points are returned as-is.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut distinct = points.to_vec();
    distinct.sort_unstable_by_key(|p| (p.y, p.x));
    distinct.dedup();
    if distinct.len() < 3 {
        return distinct;
    }
    geometry::convex_hull(distinct.as_slice())
}
