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
//! # Collision-aware layered path selection for robot arms
//!
//! Given an ordered sequence of target poses, each with several candidate
//! joint configurations (inverse-kinematics solutions), pick one
//! collision-free configuration per pose so that the total joint-space
//! motion over the whole sequence is minimal. `parry3d` is used by the
//! bundled oracle to check collisions between the robot and the environment;
//! any other backend fits behind the [`CollisionOracle`] trait.
//!
//! The pipeline runs strictly left to right: raw candidates are unwrapped
//! toward a reference pose and gated by a deviation tolerance, colliding
//! candidates are culled, the survivors form a layered graph whose edges
//! carry joint-space distances, and forward dynamic programming selects the
//! cheapest configuration per layer.
//!
//! # Example
//!
//! ```
//! use sprocket::{CandidateSet, CollisionOracle, Configuration, OracleError};
//! use sprocket::SequencePlannerBuilder;
//!
//! // stands in for a real collision backend
//! struct FreeSpace;
//!
//! impl CollisionOracle for FreeSpace {
//!     fn is_feasible(&mut self, _: &Configuration) -> Result<bool, OracleError> {
//!         Ok(true)
//!     }
//! }
//!
//! fn main() -> Result<(), sprocket::Error> {
//!     // two frames; the first admits two IK solutions
//!     let candidates = CandidateSet::from_raw(vec![
//!         vec![vec![0.0; 6], vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
//!         vec![vec![0.5, 0.0, 0.0, 0.0, 0.0, 0.0]],
//!     ])?;
//!     let reference = Configuration::from(vec![0.0; 6]);
//!
//!     let planner = SequencePlannerBuilder::new().finalize();
//!     let result = planner.plan(&mut FreeSpace, &candidates, &reference)?;
//!     assert_eq!(result.path.num_frames(), 2);
//!     println!("total joint motion = {}", result.path.total_cost);
//!     Ok(())
//! }
//! ```

mod errors;
pub use crate::errors::*;

mod configuration;
pub use crate::configuration::*;

mod normalize;
pub use crate::normalize::*;

mod filter;
pub use crate::filter::*;

mod collision_checker;
pub use crate::collision_checker::*;

mod graph;
pub use crate::graph::*;

mod solver;
pub use crate::solver::*;

mod export;
pub use crate::export::*;

mod path_planner;
pub use crate::path_planner::*;
