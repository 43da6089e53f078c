//! Collision layout engine
//!
//! Nudges marker discs apart so markers anchored at (nearly) the same
//! coordinate stay readable, while keeping each one close to its anchor.
//!
//! Each relaxation pass works like one tick of a velocity simulation:
//! - pull: velocity += (anchor - position) * pull_strength
//! - collide: pairs whose predicted discs overlap are pushed apart along
//!   the line between their centers, the overlap split by `split_ratio`
//! - integrate: position += velocity, then velocity decays
//!
//! Dense clusters may keep a small residual overlap after a few passes;
//! more passes shrink it. There is no randomness anywhere: identical input
//! gives bit-identical output.

use crate::config::LayoutConfig;
use crate::data::{Marker, Point};
use crate::projection::Anchored;

/// Golden angle in radians, used to spread coincident markers deterministically
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Distances below this are treated as coincident centers
const COINCIDENT: f64 = 1e-9;

/// A disc to be laid out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub anchor: Point,
    pub radius: f64,
}

pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Adjusted position per body, in input order
    pub fn relax(&self, bodies: &[Body]) -> Vec<Point> {
        let cfg = &self.config;
        let mut pos: Vec<Point> = bodies.iter().map(|b| b.anchor).collect();
        let mut vel = vec![Point::default(); bodies.len()];
        let keep = 1.0 - cfg.velocity_decay;

        for pass in 0..cfg.passes {
            for (i, body) in bodies.iter().enumerate() {
                vel[i].x += (body.anchor.x - pos[i].x) * cfg.pull_strength;
                vel[i].y += (body.anchor.y - pos[i].y) * cfg.pull_strength;
            }

            let pushed = self.collide(bodies, &pos, &mut vel);

            for (p, v) in pos.iter_mut().zip(vel.iter_mut()) {
                p.x += v.x;
                p.y += v.y;
                v.x *= keep;
                v.y *= keep;
            }
            tracing::trace!("Layout pass {}: {} overlapping pairs", pass, pushed);
        }

        pos
    }

    /// One sweep over all pairs; returns the number of pairs pushed apart
    fn collide(&self, bodies: &[Body], pos: &[Point], vel: &mut [Point]) -> usize {
        let cfg = &self.config;
        let mut pushed = 0;

        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let qi = Point::new(pos[i].x + vel[i].x, pos[i].y + vel[i].y);
                let qj = Point::new(pos[j].x + vel[j].x, pos[j].y + vel[j].y);
                let min_dist = bodies[i].radius + bodies[j].radius + cfg.collision_margin;
                let dist = qi.distance(qj);
                if dist >= min_dist {
                    continue;
                }

                let (ux, uy) = if dist > COINCIDENT {
                    ((qj.x - qi.x) / dist, (qj.y - qi.y) / dist)
                } else {
                    let theta = GOLDEN_ANGLE * (i * 31 + j) as f64;
                    (theta.cos(), theta.sin())
                };
                let overlap = min_dist - dist;
                let share_i = overlap * cfg.split_ratio;
                let share_j = overlap - share_i;

                vel[i].x -= ux * share_i;
                vel[i].y -= uy * share_i;
                vel[j].x += ux * share_j;
                vel[j].y += uy * share_j;
                pushed += 1;
            }
        }

        pushed
    }

    /// Assign radii from the configured size classes and lay the markers out
    pub fn place(&self, anchored: Vec<Anchored>) -> Vec<Marker> {
        let bodies: Vec<Body> = anchored
            .iter()
            .map(|a| Body {
                anchor: a.anchor,
                radius: self.config.radius_for(&a.record),
            })
            .collect();
        let positions = self.relax(&bodies);

        anchored
            .into_iter()
            .zip(bodies)
            .zip(positions)
            .map(|((a, body), position)| Marker {
                record: a.record,
                radius: body.radius,
                anchor: a.anchor,
                position,
                first_visit: None,
            })
            .collect()
    }
}

/// Largest remaining overlap between any two discs (0 when none overlap)
pub fn max_overlap(positions: &[Point], radii: &[f64]) -> f64 {
    let mut worst = 0.0f64;
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let overlap = radii[i] + radii[j] - positions[i].distance(positions[j]);
            worst = worst.max(overlap);
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(passes: usize) -> LayoutEngine {
        LayoutEngine::new(LayoutConfig {
            passes,
            ..LayoutConfig::default()
        })
    }

    fn body(x: f64, y: f64, radius: f64) -> Body {
        Body {
            anchor: Point::new(x, y),
            radius,
        }
    }

    #[test]
    fn test_zero_passes_keeps_anchors() {
        let bodies = vec![body(10.0, 10.0, 5.0), body(11.0, 10.0, 5.0)];
        let out = engine(0).relax(&bodies);
        assert_eq!(out, vec![Point::new(10.0, 10.0), Point::new(11.0, 10.0)]);
    }

    #[test]
    fn test_isolated_markers_stay_on_anchor() {
        let bodies = vec![body(0.0, 0.0, 5.0), body(100.0, 0.0, 5.0), body(0.0, 100.0, 9.0)];
        let out = engine(4).relax(&bodies);
        for (b, p) in bodies.iter().zip(&out) {
            assert_eq!(*p, b.anchor);
        }
    }

    #[test]
    fn test_coincident_pair_separates() {
        let bodies = vec![body(50.0, 50.0, 5.0), body(50.0, 50.0, 5.0)];
        let out = engine(3).relax(&bodies);
        let dist = out[0].distance(out[1]);
        assert!(dist >= 10.0 - 1e-6, "distance {}", dist);
        // Equal split keeps the pair centered on the shared anchor
        let mid = Point::new((out[0].x + out[1].x) / 2.0, (out[0].y + out[1].y) / 2.0);
        assert!(mid.distance(Point::new(50.0, 50.0)) < 1e-6);
    }

    #[test]
    fn test_separate_pairs_resolve() {
        let bodies = vec![
            body(0.0, 0.0, 5.0),
            body(3.0, 0.0, 5.0),
            body(200.0, 200.0, 9.0),
            body(204.0, 201.0, 5.0),
        ];
        let out = engine(3).relax(&bodies);
        let radii: Vec<f64> = bodies.iter().map(|b| b.radius).collect();
        assert!(max_overlap(&out, &radii) <= 1e-6);
    }

    #[test]
    fn test_more_passes_reduce_overlap() {
        let bodies: Vec<Body> = (0..6).map(|i| body(100.0 + i as f64, 100.0, 6.0)).collect();
        let radii: Vec<f64> = bodies.iter().map(|b| b.radius).collect();
        let before = max_overlap(&engine(0).relax(&bodies), &radii);
        let after = max_overlap(&engine(12).relax(&bodies), &radii);
        assert!(after < before);
    }

    #[test]
    fn test_deterministic() {
        let bodies: Vec<Body> = (0..20)
            .map(|i| body((i % 4) as f64 * 3.0, (i / 4) as f64 * 2.0, 5.0))
            .collect();
        let a = engine(5).relax(&bodies);
        let b = engine(5).relax(&bodies);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_layout() {
        assert!(engine(3).relax(&[]).is_empty());
        assert!(engine(3).place(Vec::new()).is_empty());
    }
}
