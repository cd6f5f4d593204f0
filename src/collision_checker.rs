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
use log::debug;
use nalgebra as na;
use parry3d_f64::query;
use parry3d_f64::shape::{Compound, SharedShape};
use std::sync::Arc;

use crate::configuration::Configuration;
use crate::errors::*;
use crate::filter::{CollisionOracle, OracleFactory};

/// Static obstacle geometry, loaded once per planning run and immutable for
/// its duration. Shapes are shared handles, so cloning is cheap and the
/// geometry itself can be shared across workers without synchronization.
#[derive(Clone)]
pub struct Environment {
    obstacles: Vec<(na::Isometry3<f64>, SharedShape)>,
}

impl Environment {
    pub fn new(obstacles: Vec<(na::Isometry3<f64>, SharedShape)>) -> Self {
        Environment { obstacles }
    }

    pub fn from_compound(compound: &Compound) -> Self {
        Environment {
            obstacles: compound.shapes().to_vec(),
        }
    }

    pub fn obstacles(&self) -> &[(na::Isometry3<f64>, SharedShape)] {
        &self.obstacles
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

/// Produces the robot's collision geometry, posed for a joint configuration.
///
/// Kinematics (how joint angles become link transforms) lives behind this
/// trait; the checker only needs posed shapes. Implementations must compute
/// the pose from scratch for every call so that no state carries over from
/// one query to the next.
pub trait RobotGeometry {
    fn posed_shapes(
        &self,
        joint_angles: &[f64],
    ) -> std::result::Result<Vec<(na::Isometry3<f64>, SharedShape)>, OracleError>;
}

/// Collision oracle backed by parry distance queries.
///
/// A configuration is infeasible when any robot shape comes within
/// `prediction` of any obstacle. `prediction` is the margin length for the
/// check; at `0.0` only touching or penetrating pairs are rejected.
pub struct CollisionChecker<M> {
    model: M,
    environment: Arc<Environment>,
    /// margin length for collision check
    pub prediction: f64,
}

impl<M> CollisionChecker<M>
where
    M: RobotGeometry,
{
    pub fn new(model: M, environment: Arc<Environment>, prediction: f64) -> Self {
        if environment.is_empty() {
            debug!("collision environment is empty, every query will pass");
        }
        CollisionChecker {
            model,
            environment,
            prediction,
        }
    }
}

impl<M> CollisionOracle for CollisionChecker<M>
where
    M: RobotGeometry,
{
    fn is_feasible(
        &mut self,
        config: &Configuration,
    ) -> std::result::Result<bool, OracleError> {
        // posed from scratch per query; the previous pose never leaks in
        let robot_shapes = self.model.posed_shapes(config.angles())?;
        for (robot_pose, robot_shape) in &robot_shapes {
            for (obstacle_pose, obstacle_shape) in self.environment.obstacles() {
                let dist = query::distance(
                    robot_pose,
                    &**robot_shape,
                    obstacle_pose,
                    &**obstacle_shape,
                )
                .map_err(|unsupported| {
                    OracleError::UnsupportedGeometry(format!("{unsupported:?}"))
                })?;
                if dist <= self.prediction {
                    debug!("colliding: dist={dist}, prediction={}", self.prediction);
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// Creates one `CollisionChecker` per worker, sharing the read-only
/// environment behind `Arc` while keeping each context isolated.
pub struct CollisionCheckerFactory<M> {
    model: M,
    environment: Arc<Environment>,
    prediction: f64,
}

impl<M> CollisionCheckerFactory<M>
where
    M: RobotGeometry + Clone,
{
    pub fn new(model: M, environment: Arc<Environment>, prediction: f64) -> Self {
        CollisionCheckerFactory {
            model,
            environment,
            prediction,
        }
    }
}

impl<M> OracleFactory for CollisionCheckerFactory<M>
where
    M: RobotGeometry + Clone + Sync,
{
    type Oracle = CollisionChecker<M>;

    fn create(&self) -> std::result::Result<Self::Oracle, OracleError> {
        Ok(CollisionChecker::new(
            self.model.clone(),
            Arc::clone(&self.environment),
            self.prediction,
        ))
    }
}
