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
use log::{info, warn};
use rayon::prelude::*;
use std::time::{Duration, Instant};

use crate::configuration::{CandidateSet, Configuration, FilteredCandidateSet};
use crate::errors::*;

/// Feasibility predicate over a configuration, the single seam between the
/// planner and any collision backend.
///
/// Implementations own their environment: it is loaded once at construction
/// and reused across queries, and no simulation state set for one query may
/// leak into the next. Backend failures must surface as `Err`, never as a
/// silent `Ok(true)`.
pub trait CollisionOracle {
    /// `Ok(true)` if the configuration is collision free.
    fn is_feasible(
        &mut self,
        config: &Configuration,
    ) -> std::result::Result<bool, OracleError>;
}

/// Creates one isolated oracle context per parallel worker.
///
/// Most collision backends are not safe for concurrent access to shared
/// mutable simulation state, so the parallel filter never shares a context
/// between work items. Read-only environment data may be shared internally.
pub trait OracleFactory: Sync {
    type Oracle: CollisionOracle;
    fn create(&self) -> std::result::Result<Self::Oracle, OracleError>;
}

/// Applies the collision oracle to every candidate of every frame, keeping
/// the survivors per frame in their original order.
///
/// Per-candidate oracle failures exclude the candidate and are logged; they
/// never abort the run. Only failing to create an oracle context is fatal.
pub struct CollisionFilter {
    query_timeout: Option<Duration>,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionFilter {
    pub fn new() -> Self {
        CollisionFilter {
            query_timeout: None,
        }
    }

    /// Budget for a single oracle query. A query that comes back over budget
    /// is treated as infeasible and logged as a failure, not a collision.
    /// The check is cooperative; it cannot interrupt a backend that hangs.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Filter all frames behind a single oracle context, queries serialized.
    pub fn filter<O>(&self, oracle: &mut O, candidates: &CandidateSet) -> FilteredCandidateSet
    where
        O: CollisionOracle,
    {
        let started = Instant::now();
        let frames = candidates
            .frames()
            .iter()
            .enumerate()
            .map(|(frame, configs)| self.filter_frame(oracle, frame, configs))
            .collect();
        let filtered = FilteredCandidateSet::new(frames, candidates.dof());
        self.log_reduction(candidates, &filtered, started);
        filtered
    }

    /// Filter frames on parallel workers, one fresh oracle context per frame
    /// work item. Candidate order within a frame stays ascending, so the
    /// result is identical to the serial version.
    pub fn par_filter<F>(
        &self,
        factory: &F,
        candidates: &CandidateSet,
    ) -> Result<FilteredCandidateSet>
    where
        F: OracleFactory,
    {
        let started = Instant::now();
        let frames = candidates
            .frames()
            .par_iter()
            .enumerate()
            .map(|(frame, configs)| {
                let mut oracle = factory.create()?;
                Ok(self.filter_frame(&mut oracle, frame, configs))
            })
            .collect::<Result<Vec<_>>>()?;
        let filtered = FilteredCandidateSet::new(frames, candidates.dof());
        self.log_reduction(candidates, &filtered, started);
        Ok(filtered)
    }

    fn filter_frame<O>(
        &self,
        oracle: &mut O,
        frame: usize,
        configs: &[Configuration],
    ) -> Vec<Configuration>
    where
        O: CollisionOracle,
    {
        let mut kept = Vec::with_capacity(configs.len());
        for (candidate, config) in configs.iter().enumerate() {
            let query_start = Instant::now();
            match oracle.is_feasible(config) {
                Ok(feasible) => {
                    if let Some(limit) = self.query_timeout {
                        let elapsed = query_start.elapsed();
                        if elapsed > limit {
                            let failure = OracleError::Timeout {
                                limit_ms: limit.as_millis() as u64,
                                elapsed_ms: elapsed.as_millis() as u64,
                            };
                            warn!("frame {frame} candidate {candidate}: {failure}");
                            continue;
                        }
                    }
                    if feasible {
                        kept.push(config.clone());
                    }
                }
                Err(failure) => {
                    // could not evaluate, which is not the same as colliding
                    warn!("frame {frame} candidate {candidate}: {failure}");
                }
            }
        }
        if kept.is_empty() {
            warn!("frame {frame} has no collision-free candidate");
        }
        kept
    }

    fn log_reduction(
        &self,
        before: &CandidateSet,
        after: &FilteredCandidateSet,
        started: Instant,
    ) {
        info!(
            "collision filter kept {} of {} candidates over {} frames in {:.3}s",
            after.num_candidates(),
            before.num_candidates(),
            before.num_frames(),
            started.elapsed().as_secs_f64(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rejects any configuration whose first joint angle is above a limit.
    struct FirstJointLimit {
        limit: f64,
    }

    impl CollisionOracle for FirstJointLimit {
        fn is_feasible(
            &mut self,
            config: &Configuration,
        ) -> std::result::Result<bool, OracleError> {
            Ok(config[0] <= self.limit)
        }
    }

    struct FirstJointLimitFactory {
        limit: f64,
    }

    impl OracleFactory for FirstJointLimitFactory {
        type Oracle = FirstJointLimit;
        fn create(&self) -> std::result::Result<FirstJointLimit, OracleError> {
            Ok(FirstJointLimit { limit: self.limit })
        }
    }

    /// Errors on every query with an odd candidate index.
    struct FlakyOracle {
        calls: usize,
    }

    impl CollisionOracle for FlakyOracle {
        fn is_feasible(
            &mut self,
            _config: &Configuration,
        ) -> std::result::Result<bool, OracleError> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                Err(OracleError::Backend("engine crashed".to_owned()))
            } else {
                Ok(true)
            }
        }
    }

    fn sample_set() -> CandidateSet {
        CandidateSet::from_raw(vec![
            vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![0.5, 1.0]],
            vec![vec![3.0, 0.0]],
            vec![vec![1.0, 1.0], vec![0.9, 0.0]],
        ])
        .unwrap()
    }

    #[test]
    fn survivors_are_an_ordered_subset() {
        let set = sample_set();
        let mut oracle = FirstJointLimit { limit: 1.0 };
        let filtered = CollisionFilter::new().filter(&mut oracle, &set);
        assert_eq!(filtered.frames()[0].len(), 2);
        assert_eq!(filtered.frames()[0][0], set.frames()[0][0]);
        assert_eq!(filtered.frames()[0][1], set.frames()[0][2]);
        for (kept, original) in filtered.frames().iter().zip(set.frames()) {
            for config in kept {
                assert!(original.contains(config));
            }
        }
    }

    #[test]
    fn filtering_twice_is_deterministic() {
        let set = sample_set();
        let filter = CollisionFilter::new();
        let first = filter.filter(&mut FirstJointLimit { limit: 1.0 }, &set);
        let second = filter.filter(&mut FirstJointLimit { limit: 1.0 }, &set);
        assert_eq!(first, second);
    }

    #[test]
    fn infeasible_frame_is_left_empty() {
        let set = sample_set();
        let mut oracle = FirstJointLimit { limit: 1.0 };
        let filtered = CollisionFilter::new().filter(&mut oracle, &set);
        assert_eq!(filtered.empty_frames(), vec![1]);
    }

    #[test]
    fn oracle_failure_excludes_candidate_without_aborting() {
        let set = sample_set();
        let mut oracle = FlakyOracle { calls: 0 };
        let filtered = CollisionFilter::new().filter(&mut oracle, &set);
        // every second query fails and drops its candidate
        assert_eq!(filtered.num_candidates(), 3);
    }

    #[test]
    fn parallel_matches_serial() {
        let set = sample_set();
        let filter = CollisionFilter::new();
        let serial = filter.filter(&mut FirstJointLimit { limit: 1.0 }, &set);
        let parallel = filter
            .par_filter(&FirstJointLimitFactory { limit: 1.0 }, &set)
            .unwrap();
        assert_eq!(serial, parallel);
    }
}
