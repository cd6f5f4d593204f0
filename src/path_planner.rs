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
use log::info;
use std::time::{Duration, Instant};

use crate::configuration::{CandidateSet, Configuration, FilteredCandidateSet};
use crate::errors::*;
use crate::filter::{CollisionFilter, CollisionOracle, OracleFactory};
use crate::graph::{JointSpaceMetric, MotionGraphBuilder, WeightedL1};
use crate::normalize::{Normalizer, DEFAULT_DEVIATION_TOLERANCE};
use crate::solver::{Path, ShortestPathSolver};

/// Everything a run produces: the winning path and the per-frame
/// collision-free candidates it was selected from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    pub path: Path,
    pub collision_free: FilteredCandidateSet,
}

/// Full selection pipeline: normalize candidates against the reference pose,
/// cull colliding ones, build the layered motion graph and pick the
/// minimum-cost configuration per frame.
///
/// Each call owns its artifacts; nothing is shared between planning runs.
pub struct SequencePlanner<M = WeightedL1> {
    tolerance: f64,
    periodic: Option<Vec<bool>>,
    metric: M,
    filter: CollisionFilter,
}

impl<M> SequencePlanner<M>
where
    M: JointSpaceMetric + Clone,
{
    /// Plan with a single oracle context; collision queries are serialized.
    ///
    /// `reference` is the configuration the arm occupies before motion
    /// begins: candidates are unwrapped toward it, gated by the deviation
    /// tolerance, and the move away from it is part of the path cost.
    pub fn plan<O>(
        &self,
        oracle: &mut O,
        candidates: &CandidateSet,
        reference: &Configuration,
    ) -> Result<PlanResult>
    where
        O: CollisionOracle,
    {
        let started = Instant::now();
        let normalized = self.normalizer(reference).normalize_set(candidates)?;
        self.log_normalized(candidates, &normalized);
        let collision_free = self.filter.filter(oracle, &normalized);
        self.finish(candidates, reference, collision_free, started)
    }

    /// Plan with one isolated oracle context per parallel worker. The result
    /// is identical to [`plan`](Self::plan) with an equivalent oracle.
    pub fn plan_parallel<F>(
        &self,
        factory: &F,
        candidates: &CandidateSet,
        reference: &Configuration,
    ) -> Result<PlanResult>
    where
        F: OracleFactory,
    {
        let started = Instant::now();
        let normalized = self.normalizer(reference).normalize_set(candidates)?;
        self.log_normalized(candidates, &normalized);
        let collision_free = self.filter.par_filter(factory, &normalized)?;
        self.finish(candidates, reference, collision_free, started)
    }

    fn normalizer(&self, reference: &Configuration) -> Normalizer {
        let normalizer = Normalizer::new(reference.clone()).tolerance(self.tolerance);
        match &self.periodic {
            Some(periodic) => normalizer.periodic_joints(periodic.clone()),
            None => normalizer,
        }
    }

    fn log_normalized(&self, input: &CandidateSet, normalized: &CandidateSet) {
        info!(
            "normalization kept {} of {} candidates",
            normalized.num_candidates(),
            input.num_candidates(),
        );
    }

    fn finish(
        &self,
        input: &CandidateSet,
        reference: &Configuration,
        collision_free: FilteredCandidateSet,
        started: Instant,
    ) -> Result<PlanResult> {
        let graph = MotionGraphBuilder::new()
            .metric(self.metric.clone())
            .start_configuration(reference.clone())
            .build(&collision_free)?;
        let path = ShortestPathSolver::new().solve(&graph)?;
        info!(
            "planned {} frames from {} candidates in {:.3}s, length: {}",
            input.num_frames(),
            input.num_candidates(),
            started.elapsed().as_secs_f64(),
            path.total_cost,
        );
        Ok(PlanResult {
            path,
            collision_free,
        })
    }
}

/// Builder for [`SequencePlanner`]
pub struct SequencePlannerBuilder<M = WeightedL1> {
    tolerance: f64,
    periodic: Option<Vec<bool>>,
    metric: M,
    query_timeout: Option<Duration>,
}

impl Default for SequencePlannerBuilder<WeightedL1> {
    fn default() -> Self {
        Self::new()
    }
}

impl SequencePlannerBuilder<WeightedL1> {
    pub fn new() -> Self {
        SequencePlannerBuilder {
            tolerance: DEFAULT_DEVIATION_TOLERANCE,
            periodic: None,
            metric: WeightedL1::uniform(),
            query_timeout: None,
        }
    }

    /// Per-joint weights for the default weighted L1 edge cost
    pub fn joint_weights(mut self, weights: Vec<f64>) -> Self {
        self.metric = WeightedL1::with_weights(weights);
        self
    }
}

impl<M> SequencePlannerBuilder<M>
where
    M: JointSpaceMetric + Clone,
{
    /// Maximum per-joint deviation from the reference pose, in radians
    /// (inclusive). Defaults to 120 degrees.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Which joints wrap around a full revolution; unlisted means all do.
    pub fn periodic_joints(mut self, periodic: Vec<bool>) -> Self {
        self.periodic = Some(periodic);
        self
    }

    /// Replace the edge weighting policy entirely
    pub fn metric<M2: JointSpaceMetric + Clone>(self, metric: M2) -> SequencePlannerBuilder<M2> {
        SequencePlannerBuilder {
            tolerance: self.tolerance,
            periodic: self.periodic,
            metric,
            query_timeout: self.query_timeout,
        }
    }

    /// Time budget per collision query; overruns count as infeasible.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn finalize(self) -> SequencePlanner<M> {
        let mut filter = CollisionFilter::new();
        if let Some(timeout) = self.query_timeout {
            filter = filter.query_timeout(timeout);
        }
        SequencePlanner {
            tolerance: self.tolerance,
            periodic: self.periodic,
            metric: self.metric,
            filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct FreeSpace;

    impl CollisionOracle for FreeSpace {
        fn is_feasible(
            &mut self,
            _config: &Configuration,
        ) -> std::result::Result<bool, OracleError> {
            Ok(true)
        }
    }

    struct FreeSpaceFactory;

    impl OracleFactory for FreeSpaceFactory {
        type Oracle = FreeSpace;
        fn create(&self) -> std::result::Result<FreeSpace, OracleError> {
            Ok(FreeSpace)
        }
    }

    /// Rejects everything whose first joint matches a blocked value.
    struct BlockFirstJoint {
        blocked: f64,
    }

    impl CollisionOracle for BlockFirstJoint {
        fn is_feasible(
            &mut self,
            config: &Configuration,
        ) -> std::result::Result<bool, OracleError> {
            Ok((config[0] - self.blocked).abs() > 1e-9)
        }
    }

    fn three_frame_candidates() -> CandidateSet {
        CandidateSet::from_raw(vec![
            vec![vec![0.0; 6], vec![10.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
            vec![vec![5.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
            vec![vec![0.0; 6], vec![20.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
        ])
        .unwrap()
    }

    #[test]
    fn selects_minimum_total_motion() {
        // linear axes, wide tolerance: values pass through unmodified
        let planner = SequencePlannerBuilder::new()
            .tolerance(20.0)
            .periodic_joints(vec![false; 6])
            .finalize();
        let reference = Configuration::from(vec![0.0; 6]);
        let result = planner
            .plan(&mut FreeSpace, &three_frame_candidates(), &reference)
            .unwrap();
        assert_eq!(result.path.selections, vec![0, 0, 0]);
        assert_relative_eq!(result.path.total_cost, 10.0);
        assert_eq!(
            result.path.configurations[1],
            Configuration::from(vec![5.0, 0.0, 0.0, 0.0, 0.0, 0.0])
        );
    }

    #[test]
    fn parallel_plan_is_identical() {
        let planner = SequencePlannerBuilder::new()
            .tolerance(20.0)
            .periodic_joints(vec![false; 6])
            .finalize();
        let reference = Configuration::from(vec![0.0; 6]);
        let serial = planner
            .plan(&mut FreeSpace, &three_frame_candidates(), &reference)
            .unwrap();
        let parallel = planner
            .plan_parallel(&FreeSpaceFactory, &three_frame_candidates(), &reference)
            .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn infeasible_frame_aborts_with_its_index() {
        let planner = SequencePlannerBuilder::new()
            .tolerance(20.0)
            .periodic_joints(vec![false; 6])
            .finalize();
        let reference = Configuration::from(vec![0.0; 6]);
        // frame 1 has only the blocked candidate, the run must fail loudly
        let err = planner
            .plan(
                &mut BlockFirstJoint { blocked: 5.0 },
                &three_frame_candidates(),
                &reference,
            )
            .unwrap_err();
        match err {
            Error::InfeasibleFrames { frames } => assert_eq!(frames, vec![1]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn joint_weights_change_the_winner() {
        let candidates = CandidateSet::from_raw(vec![
            vec![vec![0.0, 0.0]],
            // same L1 distance under uniform weights, different under weighted
            vec![vec![2.0, 0.0], vec![0.0, 2.0]],
        ])
        .unwrap();
        let reference = Configuration::from(vec![0.0, 0.0]);
        let uniform = SequencePlannerBuilder::new()
            .tolerance(5.0)
            .periodic_joints(vec![false; 2])
            .finalize();
        let weighted = SequencePlannerBuilder::new()
            .joint_weights(vec![10.0, 1.0])
            .tolerance(5.0)
            .periodic_joints(vec![false; 2])
            .finalize();
        let first = uniform.plan(&mut FreeSpace, &candidates, &reference).unwrap();
        let second = weighted.plan(&mut FreeSpace, &candidates, &reference).unwrap();
        // tie under uniform weights resolves to the earliest candidate
        assert_eq!(first.path.selections[1], 0);
        assert_eq!(second.path.selections[1], 1);
        assert_relative_eq!(second.path.total_cost, 2.0);
    }

    #[test]
    fn tolerance_gate_feeds_the_filter() {
        let candidates = CandidateSet::from_raw(vec![
            vec![vec![0.5], vec![3.0]],
            vec![vec![0.25]],
        ])
        .unwrap();
        let reference = Configuration::from(vec![0.0]);
        let planner = SequencePlannerBuilder::new()
            .tolerance(1.0)
            .periodic_joints(vec![false])
            .finalize();
        let result = planner.plan(&mut FreeSpace, &candidates, &reference).unwrap();
        // the 3.0 candidate never reaches the collision filter
        assert_eq!(result.collision_free.frames()[0].len(), 1);
        assert_relative_eq!(result.path.total_cost, 0.5 + 0.25);
    }
}
