/*
Copyright 2017 Takashi Ogura

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/
use log::{debug, warn};
use std::f64::consts::TAU;

use crate::configuration::{CandidateSet, Configuration};
use crate::errors::*;

/// Default gate on the deviation from the reference pose: 120 degrees.
pub const DEFAULT_DEVIATION_TOLERANCE: f64 = 2.0 * std::f64::consts::PI / 3.0;

/// Find the angle equivalent to `theta` (mod full revolutions) that is
/// numerically closest to `reference`.
pub fn snap_angle(theta: f64, reference: f64) -> f64 {
    theta + ((reference - theta) / TAU).round() * TAU
}

/// Canonicalizes candidate configurations against a reference pose and
/// rejects candidates that deviate too far from it.
///
/// Pure; the same inputs always produce the same outputs.
pub struct Normalizer {
    reference: Configuration,
    tolerance: f64,
    periodic: Vec<bool>,
}

impl Normalizer {
    /// All joints are treated as periodic (revolute without limits) unless
    /// changed with [`periodic_joints`](Self::periodic_joints).
    pub fn new(reference: Configuration) -> Self {
        let dof = reference.dof();
        Normalizer {
            reference,
            tolerance: DEFAULT_DEVIATION_TOLERANCE,
            periodic: vec![true; dof],
        }
    }

    /// Maximum allowed per-joint deviation from the reference, in radians.
    /// The boundary is inclusive: a candidate exactly at the tolerance is kept.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Mark which joints wrap around a full revolution. Non-periodic joints
    /// (linear axes, limited revolutes) pass through unmodified.
    pub fn periodic_joints(mut self, periodic: Vec<bool>) -> Self {
        self.periodic = periodic;
        self
    }

    pub fn reference(&self) -> &Configuration {
        &self.reference
    }

    fn check_dof(&self, dof: usize) -> std::result::Result<(), ValidationError> {
        if self.reference.dof() != dof {
            return Err(ValidationError::DofMismatch {
                expected: dof,
                actual: self.reference.dof(),
            });
        }
        if self.periodic.len() != dof {
            return Err(ValidationError::DofMismatch {
                expected: dof,
                actual: self.periodic.len(),
            });
        }
        Ok(())
    }

    /// Unwrap each periodic joint of `config` next to the reference and
    /// return the normalized configuration together with its deviation, the
    /// maximum per-joint absolute difference from the reference.
    pub fn normalize(
        &self,
        config: &Configuration,
    ) -> std::result::Result<(Configuration, f64), ValidationError> {
        self.check_dof(config.dof())?;
        let mut angles = Vec::with_capacity(config.dof());
        let mut deviation = 0.0f64;
        for (joint, (&theta, &reference)) in config
            .angles()
            .iter()
            .zip(self.reference.angles())
            .enumerate()
        {
            let snapped = if self.periodic[joint] {
                snap_angle(theta, reference)
            } else {
                theta
            };
            deviation = deviation.max((snapped - reference).abs());
            angles.push(snapped);
        }
        Ok((Configuration::new(angles), deviation))
    }

    /// Whether a deviation passes the tolerance gate.
    pub fn accepts(&self, deviation: f64) -> bool {
        deviation <= self.tolerance
    }

    /// Normalize every candidate of every frame and drop the ones whose
    /// deviation exceeds the tolerance. Candidate order is preserved.
    pub fn normalize_set(&self, candidates: &CandidateSet) -> Result<CandidateSet> {
        self.check_dof(candidates.dof())?;
        let mut frames = Vec::with_capacity(candidates.num_frames());
        for (frame, configs) in candidates.frames().iter().enumerate() {
            let mut kept = Vec::with_capacity(configs.len());
            for config in configs {
                let (normalized, deviation) = self.normalize(config)?;
                if self.accepts(deviation) {
                    kept.push(normalized);
                } else {
                    debug!(
                        "frame {frame}: dropped candidate, deviation {:.4} rad over tolerance {:.4}",
                        deviation, self.tolerance
                    );
                }
            }
            if kept.is_empty() {
                warn!("frame {frame} has no candidate within tolerance");
            }
            frames.push(kept);
        }
        Ok(CandidateSet::from_validated(frames, candidates.dof()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn snap_picks_nearest_revolution() {
        assert_relative_eq!(snap_angle(0.1, 0.0), 0.1);
        assert_relative_eq!(snap_angle(0.1 + TAU, 0.0), 0.1);
        assert_relative_eq!(snap_angle(0.1 - 2.0 * TAU, 0.0), 0.1);
        assert_relative_eq!(snap_angle(-0.2, TAU), TAU - 0.2);
        // exactly half a revolution away rounds to the reference side
        assert_relative_eq!(snap_angle(3.0, 3.0 + PI + 0.01), 3.0 + TAU);
    }

    #[test]
    fn normalize_is_idempotent() {
        let reference = Configuration::from(vec![0.0, 1.0, -2.0]);
        let normalizer = Normalizer::new(reference);
        let candidate = Configuration::from(vec![0.5 + TAU, 1.0 - TAU, -2.5]);
        let (once, deviation) = normalizer.normalize(&candidate).unwrap();
        let (twice, deviation_again) = normalizer.normalize(&once).unwrap();
        assert_eq!(once, twice);
        assert_relative_eq!(deviation, deviation_again);
        assert_relative_eq!(deviation, 0.5);
    }

    #[test]
    fn non_periodic_joints_pass_through() {
        let normalizer = Normalizer::new(Configuration::from(vec![0.0, 0.0]))
            .periodic_joints(vec![false, true]);
        let candidate = Configuration::from(vec![TAU + 0.25, TAU + 0.25]);
        let (normalized, deviation) = normalizer.normalize(&candidate).unwrap();
        assert_relative_eq!(normalized[0], TAU + 0.25);
        assert_relative_eq!(normalized[1], 0.25);
        // deviation is dominated by the unmodified linear axis
        assert_relative_eq!(deviation, TAU + 0.25);
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        let normalizer = Normalizer::new(Configuration::from(vec![0.0]))
            .tolerance(120.0f64.to_radians());
        let (_, at_limit) = normalizer
            .normalize(&Configuration::from(vec![120.0f64.to_radians()]))
            .unwrap();
        let (_, over_limit) = normalizer
            .normalize(&Configuration::from(vec![120.01f64.to_radians()]))
            .unwrap();
        assert!(normalizer.accepts(at_limit));
        assert!(!normalizer.accepts(over_limit));
    }

    #[test]
    fn normalize_set_drops_out_of_tolerance_candidates() {
        let candidates = CandidateSet::from_raw(vec![
            vec![vec![0.1, 0.0], vec![PI, 0.0]],
            vec![vec![TAU, TAU]],
        ])
        .unwrap();
        let normalizer =
            Normalizer::new(Configuration::from(vec![0.0, 0.0])).tolerance(1.0);
        let normalized = normalizer.normalize_set(&candidates).unwrap();
        assert_eq!(normalized.frames()[0].len(), 1);
        assert_eq!(normalized.frames()[1].len(), 1);
        assert_relative_eq!(normalized.frames()[1][0][0], 0.0);
        assert_relative_eq!(normalized.frames()[1][0][1], 0.0);
    }

    #[test]
    fn dof_mismatch_is_rejected() {
        let normalizer = Normalizer::new(Configuration::from(vec![0.0, 0.0]));
        let err = normalizer
            .normalize(&Configuration::from(vec![0.0, 0.0, 0.0]))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::DofMismatch {
                expected: 3,
                actual: 2,
            }
        );
    }
}
