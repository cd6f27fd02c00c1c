//! Curve geometry for the ball path
//!
//! The path is stored as a polyline and parameterized by normalized arc
//! length, so `t * length` is the distance travelled from the start:
//! - t in [0, 1]: on the path
//! - t < 0: buffer zone, extrapolated backwards along the start tangent

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lerp;

/// Resolution of the nearest-point search
///
/// The coarse pass samples the whole curve uniformly. The optional refine
/// pass resamples one coarse step on each side of the coarse winner, which
/// matters on tightly curved paths where 100 samples can miss by half a ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearestSampling {
    pub coarse: u32,
    pub refine: Option<u32>,
}

impl Default for NearestSampling {
    fn default() -> Self {
        Self {
            coarse: crate::consts::NEAREST_SAMPLES,
            refine: Some(16),
        }
    }
}

impl NearestSampling {
    /// Single pass, no refinement
    pub fn coarse_only(samples: u32) -> Self {
        Self {
            coarse: samples,
            refine: None,
        }
    }
}

/// A path in 3-space
#[derive(Debug, Clone)]
pub struct Curve {
    points: Vec<Vec3>,
    /// Arc length from the start to each point
    cumulative: Vec<f32>,
    length: f32,
}

impl Curve {
    /// Straight segments through `points`
    pub fn polyline(points: Vec<Vec3>) -> Result<Self, ConfigError> {
        if points.len() < 2 {
            return Err(ConfigError::TooFewPoints(points.len()));
        }

        // Zero-length segments have no tangent
        let mut deduped: Vec<Vec3> = Vec::with_capacity(points.len());
        for p in points {
            if deduped.last() != Some(&p) {
                deduped.push(p);
            }
        }
        if deduped.len() < 2 {
            return Err(ConfigError::DegenerateCurve);
        }

        let mut cumulative = Vec::with_capacity(deduped.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in deduped.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }

        if !total.is_finite() || total <= 0.0 {
            return Err(ConfigError::DegenerateCurve);
        }

        Ok(Self {
            points: deduped,
            cumulative,
            length: total,
        })
    }

    /// Uniform Catmull-Rom spline through `control`,
    /// flattened to `samples_per_segment` points per span
    pub fn catmull_rom(control: &[Vec3], samples_per_segment: usize) -> Result<Self, ConfigError> {
        if control.len() < 2 {
            return Err(ConfigError::TooFewPoints(control.len()));
        }
        if samples_per_segment == 0 {
            return Err(ConfigError::ZeroSampling);
        }

        let n = control.len();
        let mut points = Vec::with_capacity((n - 1) * samples_per_segment + 1);
        for i in 0..n - 1 {
            let p0 = control[i.saturating_sub(1)];
            let p1 = control[i];
            let p2 = control[i + 1];
            let p3 = control[(i + 2).min(n - 1)];
            for s in 0..samples_per_segment {
                let t = s as f32 / samples_per_segment as f32;
                points.push(catmull_rom_point(p0, p1, p2, p3, t));
            }
        }
        points.push(control[n - 1]);

        Self::polyline(points)
    }

    /// Rising spiral around `center` (the boss path)
    pub fn spiral(
        center: Vec3,
        radius: f32,
        height: f32,
        turns: f32,
        resolution: usize,
    ) -> Result<Self, ConfigError> {
        if resolution < 2 {
            return Err(ConfigError::TooFewPoints(resolution));
        }

        let points = (0..resolution)
            .map(|i| {
                let t = i as f32 / (resolution - 1) as f32;
                let angle = t * std::f32::consts::TAU * turns;
                center
                    + Vec3::new(
                        angle.cos() * radius,
                        lerp(-height / 2.0, height / 2.0, t),
                        angle.sin() * radius,
                    )
            })
            .collect();

        Self::polyline(points)
    }

    /// Arc length at t=1
    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Polyline vertices (for debug drawing)
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// World position at parameter `t`
    pub fn position(&self, t: f32) -> Vec3 {
        if t < 0.0 {
            return self.points[0] + self.tangent(0.0) * (t * self.length);
        }
        let (seg, local) = self.locate(t);
        self.points[seg].lerp(self.points[seg + 1], local)
    }

    /// Unit tangent at parameter `t` (the buffer zone reuses the t=0 tangent)
    pub fn tangent(&self, t: f32) -> Vec3 {
        let (seg, _) = self.locate(t);
        (self.points[seg + 1] - self.points[seg]).normalize_or_zero()
    }

    /// Parameter of the curve point closest to `point`
    ///
    /// Only [0, 1] is searched; hits never land in the buffer zone.
    pub fn nearest_parameter(&self, point: Vec3, sampling: NearestSampling) -> f32 {
        let coarse = sampling.coarse.max(1);
        let (mut best, best_dist) = self.scan(point, 0.0, 1.0, coarse);

        if let Some(refine) = sampling.refine {
            let step = 1.0 / coarse as f32;
            let lo = (best - step).max(0.0);
            let hi = (best + step).min(1.0);
            let (t, dist) = self.scan(point, lo, hi, refine.max(1));
            if dist < best_dist {
                best = t;
            }
        }

        best
    }

    /// Uniform scan of `samples + 1` points over [lo, hi]; earliest wins ties
    fn scan(&self, point: Vec3, lo: f32, hi: f32, samples: u32) -> (f32, f32) {
        let mut best_t = lo;
        let mut best_dist = f32::MAX;
        for i in 0..=samples {
            let t = lo + (hi - lo) * (i as f32 / samples as f32);
            let dist = self.position(t).distance_squared(point);
            if dist < best_dist {
                best_dist = dist;
                best_t = t;
            }
        }
        (best_t, best_dist)
    }

    /// Segment index and local fraction for a clamped parameter
    fn locate(&self, t: f32) -> (usize, f32) {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let dist = t * self.length;
        let last_seg = self.points.len() - 2;
        let seg = self
            .cumulative
            .partition_point(|&c| c <= dist)
            .saturating_sub(1)
            .min(last_seg);
        let start = self.cumulative[seg];
        let seg_len = self.cumulative[seg + 1] - start;
        let local = ((dist - start) / seg_len).clamp(0.0, 1.0);
        (seg, local)
    }
}

fn catmull_rom_point(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}
