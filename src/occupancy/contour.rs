//! Binary masks and external boundary tracing.

use imageproc::geometry::contour_area;

use crate::depth::DepthMap;

/// Integer pixel coordinate, y pointing down.
pub type Point = imageproc::point::Point<i32>;

/// Neighbour offsets indexed by direction, counterclockwise on screen
/// starting east.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const WEST: usize = 4;

/// Foreground/background mask.
#[derive(Clone, Debug)]
pub struct Mask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl Mask {
    /// Foreground where depth is at most `level` (closer than the cut).
    pub fn depth_at_most(depth: &DepthMap, level: f64) -> Self {
        let bits = depth.values().iter().map(|v| (*v as f64) <= level).collect();
        Self {
            width: depth.width() as usize,
            height: depth.height() as usize,
            bits,
        }
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                bits.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    pub fn is_set(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.bits[y as usize * self.width + x as usize]
    }
}

/// One external boundary per 8-connected foreground component, in raster
/// order of each component's first pixel.
pub fn external_contours(mask: &Mask) -> Vec<Vec<Point>> {
    let mut visited = vec![false; mask.bits.len()];
    let mut stack = Vec::with_capacity(64);
    let mut contours = Vec::new();

    for start in 0..mask.bits.len() {
        if !mask.bits[start] || visited[start] {
            continue;
        }
        let origin = Point::new((start % mask.width) as i32, (start / mask.width) as i32);

        // Grow the component so later seeds inside it are skipped.
        let mut size = 0usize;
        visited[start] = true;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            size += 1;
            let x = (idx % mask.width) as i32;
            let y = (idx / mask.width) as i32;
            for (dx, dy) in DIRECTIONS {
                let (nx, ny) = (x + dx, y + dy);
                if mask.is_set(nx, ny) {
                    let n = ny as usize * mask.width + nx as usize;
                    if !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        contours.push(trace_border(mask, origin, size));
    }
    contours
}

/// Follow the outer border of the component whose top-left-most pixel is
/// `origin`. Its west neighbour is background by construction.
fn trace_border(mask: &Mask, origin: Point, size: usize) -> Vec<Point> {
    let step = |p: Point, dir: usize| {
        let (dx, dy) = DIRECTIONS[dir];
        Point::new(p.x + dx, p.y + dy)
    };

    // Clockwise from west for the last pixel of the loop.
    let last = (0..8)
        .map(|k| (WEST + 8 - k) % 8)
        .map(|dir| step(origin, dir))
        .find(|p| mask.is_set(p.x, p.y));
    let Some(last) = last else {
        return vec![origin];
    };

    let mut contour = Vec::new();
    let mut previous = last;
    let mut current = origin;
    // Each border pixel is entered at most four times.
    for _ in 0..(4 * size + 4) {
        contour.push(current);
        let back = direction(current, previous);
        let next = (1..=8)
            .map(|k| step(current, (back + k) % 8))
            .find(|p| mask.is_set(p.x, p.y))
            .unwrap_or(previous);
        if next == origin && current == last {
            break;
        }
        previous = current;
        current = next;
    }
    contour
}

fn direction(from: Point, to: Point) -> usize {
    let offset = (to.x - from.x, to.y - from.y);
    DIRECTIONS
        .iter()
        .position(|d| *d == offset)
        .unwrap_or(WEST)
}

/// Absolute shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    contour_area(points).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_rectangle_traces_its_corners() {
        let mask = Mask::from_fn(60, 50, |x, y| (10..50).contains(&x) && (5..35).contains(&y));
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        let contour = &contours[0];
        assert_eq!(contour[0], Point::new(10, 5));
        assert_eq!(contour[1], Point::new(10, 6));
        assert!(contour.contains(&Point::new(49, 34)));
        assert_eq!(contour.len(), 2 * (39 + 29));
        assert_eq!(polygon_area(contour), 39.0 * 29.0);
    }

    #[test]
    fn isolated_pixel_and_line_have_zero_area() {
        let dot = Mask::from_fn(5, 5, |x, y| x == 2 && y == 2);
        let contours = external_contours(&dot);
        assert_eq!(contours, vec![vec![Point::new(2, 2)]]);
        assert_eq!(polygon_area(&contours[0]), 0.0);

        let line = Mask::from_fn(10, 3, |_, y| y == 1);
        let contours = external_contours(&line);
        assert_eq!(contours.len(), 1);
        assert_eq!(polygon_area(&contours[0]), 0.0);
    }

    #[test]
    fn separate_blobs_yield_separate_contours() {
        let mask = Mask::from_fn(120, 120, |x, y| {
            (x < 40 && y < 40) || ((60..70).contains(&x) && (60..70).contains(&y))
        });
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 2);
        assert_eq!(polygon_area(&contours[0]), 1521.0);
        assert_eq!(polygon_area(&contours[1]), 81.0);
    }

    #[test]
    fn diagonal_neighbours_join_one_component() {
        let mask = Mask::from_fn(4, 4, |x, y| x == y);
        assert_eq!(external_contours(&mask).len(), 1);
    }

    #[test]
    fn ring_contour_ignores_the_hole() {
        let mask = Mask::from_fn(120, 120, |x, y| {
            let outer = (5..65).contains(&x) && (5..65).contains(&y);
            let hole = (20..50).contains(&x) && (20..50).contains(&y);
            outer && !hole
        });
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(polygon_area(&contours[0]), 59.0 * 59.0);
    }

    #[test]
    fn inner_corner_is_cut_diagonally() {
        // Touches the image corner: still an outer border, not a hole.
        let mask = Mask::from_fn(120, 120, |x, y| (x < 100 && y < 20) || (x < 20 && y < 100));
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].contains(&Point::new(19, 20)));
        assert!(contours[0].contains(&Point::new(20, 19)));
        assert!(!contours[0].contains(&Point::new(19, 19)));
        assert_eq!(polygon_area(&contours[0]), 3401.5);
    }

    #[test]
    fn depth_mask_is_inclusive() {
        let depth = DepthMap::new(vec![0.5, 0.7, 0.9, 2.0], 2, 2).unwrap();
        let mask = Mask::depth_at_most(&depth, 0.7);
        assert_eq!(mask.count(), 2);
        assert!(mask.is_set(0, 0));
        assert!(mask.is_set(1, 0));
        assert!(!mask.is_set(0, 1));
        assert!(!mask.is_set(-1, 0));
    }
}
