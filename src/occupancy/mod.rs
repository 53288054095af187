//! Depth-band silhouette clutter score.
//!
//! For each depth cut the near-field mask is reduced to its largest external
//! contour; the concavity deficit `(hull - contour) / hull` of that contour
//! is summed over all cuts. A single smooth mass scores near zero, several
//! separate bodies or legs score high.

mod contour;
mod hull;

use log::debug;

use crate::depth::DepthMap;

pub use contour::{external_contours, polygon_area, Mask, Point};
pub use hull::convex_hull;

/// Arithmetic sequence of depth cuts, `start` inclusive, `end` exclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthLevels {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl Default for DepthLevels {
    fn default() -> Self {
        Self {
            start: 0.5,
            end: 2.1,
            step: 0.2,
        }
    }
}

/// Upper bound on the number of cuts one score may evaluate.
pub const MAX_DEPTH_LEVELS: usize = 256;

impl DepthLevels {
    /// Number of cuts these bounds describe, `None` when any bound is
    /// non-finite or the step is not positive.
    pub fn count(&self) -> Option<f64> {
        let finite = self.start.is_finite() && self.end.is_finite() && self.step.is_finite();
        if !finite || !(self.step > 0.0) {
            return None;
        }
        Some(((self.end - self.start) / self.step).ceil().max(0.0))
    }

    /// Materialise the cuts, at most [`MAX_DEPTH_LEVELS`] of them. Invalid
    /// bounds yield nothing.
    pub fn values(&self) -> Vec<f64> {
        if self.count().is_none() {
            return Vec::new();
        }
        let limit = self.end - self.step * 1e-6;
        (0..MAX_DEPTH_LEVELS)
            .map(|i| self.start + self.step * i as f64)
            .take_while(|level| *level < limit)
            .collect()
    }
}

pub const DEFAULT_MIN_CONTOUR_AREA: f64 = 1000.0;

/// Scores depth maps for crowding.
#[derive(Clone, Debug)]
pub struct OccupancyScorer {
    levels: Vec<f64>,
    min_area: f64,
}

impl OccupancyScorer {
    pub fn new(levels: DepthLevels, min_area: f64) -> Self {
        Self {
            levels: levels.values(),
            min_area,
        }
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Clutter score of `depth` resampled to `target` (frame width, height).
    /// Always >= 0; zero when no cut has a contour above the area floor.
    pub fn score(&self, depth: &DepthMap, target: (u32, u32)) -> f64 {
        let depth = depth.resized(target.0, target.1);
        let mut total = 0.0;
        for level in &self.levels {
            let mask = Mask::depth_at_most(&depth, *level);
            let Some((contour, area)) = external_contours(&mask)
                .into_iter()
                .map(|c| {
                    let area = polygon_area(&c);
                    (c, area)
                })
                .max_by(|a, b| a.1.total_cmp(&b.1))
            else {
                continue;
            };
            if area < self.min_area {
                continue;
            }
            let hull_area = polygon_area(&convex_hull(&contour));
            if hull_area > 0.0 {
                let deficit = (hull_area - area) / hull_area;
                debug!(
                    "level {:.2}: contour {:.1} hull {:.1} deficit {:.3}",
                    level, area, hull_area, deficit
                );
                total += deficit;
            }
        }
        total
    }
}

impl Default for OccupancyScorer {
    fn default() -> Self {
        Self::new(DepthLevels::default(), DEFAULT_MIN_CONTOUR_AREA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(width: u32, height: u32, near: impl Fn(u32, u32) -> bool) -> DepthMap {
        let mut values = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                values.push(if near(x, y) { 1.0 } else { 5.0 });
            }
        }
        DepthMap::new(values, width, height).unwrap()
    }

    #[test]
    fn default_levels_are_eight_cuts() {
        let levels = DepthLevels::default().values();
        assert_eq!(levels.len(), 8);
        assert!((levels[0] - 0.5).abs() < 1e-9);
        assert!((levels[7] - 1.9).abs() < 1e-9);
    }

    #[test]
    fn invalid_step_yields_no_levels() {
        let levels = DepthLevels {
            start: 0.5,
            end: 2.1,
            step: 0.0,
        };
        assert!(levels.values().is_empty());
    }

    #[test]
    fn unbounded_levels_are_capped_or_rejected() {
        let infinite = DepthLevels {
            end: f64::INFINITY,
            ..DepthLevels::default()
        };
        assert_eq!(infinite.count(), None);
        assert!(infinite.values().is_empty());

        let nan_step = DepthLevels {
            step: f64::NAN,
            ..DepthLevels::default()
        };
        assert!(nan_step.values().is_empty());

        let tiny = DepthLevels {
            step: 1e-12,
            ..DepthLevels::default()
        };
        assert!(tiny.count().unwrap() > MAX_DEPTH_LEVELS as f64);
        assert_eq!(tiny.values().len(), MAX_DEPTH_LEVELS);
    }

    #[test]
    fn empty_scene_scores_zero() {
        let scorer = OccupancyScorer::default();
        let far = DepthMap::uniform(64, 48, 3.0);
        assert_eq!(scorer.score(&far, (640, 480)), 0.0);
    }

    #[test]
    fn small_blob_is_below_area_floor() {
        let scorer = OccupancyScorer::default();
        let depth = scene(120, 120, |x, y| (50..70).contains(&x) && (50..70).contains(&y));
        assert_eq!(scorer.score(&depth, (120, 120)), 0.0);
    }

    #[test]
    fn convex_mass_scores_zero() {
        let scorer = OccupancyScorer::default();
        let depth = scene(120, 120, |x, y| (10..90).contains(&x) && (20..100).contains(&y));
        assert_eq!(scorer.score(&depth, (120, 120)), 0.0);
    }

    #[test]
    fn concave_silhouette_scores_per_band() {
        let scorer = OccupancyScorer::default();
        let depth = scene(120, 120, |x, y| (x < 100 && y < 20) || (x < 20 && y < 100));
        // Near at 1.0: present in the five cuts 1.1 ..= 1.9.
        let per_band = (6601.0 - 3401.5) / 6601.0;
        let score = scorer.score(&depth, (120, 120));
        assert!((score - 5.0 * per_band).abs() < 1e-9, "score {}", score);
        assert!(score > 0.5);
    }

    #[test]
    fn largest_contour_wins() {
        let scorer = OccupancyScorer::new(DepthLevels::default(), 1000.0);
        // Convex block plus a smaller concave one: only the block counts.
        let depth = scene(200, 200, |x, y| {
            let block = x < 80 && y < 80;
            let l_shape = (x >= 120 && y >= 120) && (x < 140 || y < 140);
            block || l_shape
        });
        assert_eq!(scorer.score(&depth, (200, 200)), 0.0);
    }

    #[test]
    fn score_is_never_negative() {
        let scorer = OccupancyScorer::default();
        let values: Vec<f32> = (0..64 * 64)
            .map(|i| 0.4 + ((i * 7919) % 23) as f32 * 0.1)
            .collect();
        let depth = DepthMap::new(values, 64, 64).unwrap();
        assert!(scorer.score(&depth, (128, 96)) >= 0.0);
    }
}
