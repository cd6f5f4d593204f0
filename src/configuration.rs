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
use serde::{Deserialize, Serialize};

use crate::errors::*;

/// An ordered tuple of joint angles, one way to reach a target frame.
///
/// Immutable once produced; every pipeline stage creates new values instead
/// of mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(Vec<f64>);

impl Configuration {
    pub fn new(angles: Vec<f64>) -> Self {
        Configuration(angles)
    }

    pub fn angles(&self) -> &[f64] {
        &self.0
    }

    /// Number of joints
    pub fn dof(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<f64>> for Configuration {
    fn from(angles: Vec<f64>) -> Self {
        Configuration(angles)
    }
}

impl<'a> From<&'a [f64]> for Configuration {
    fn from(angles: &'a [f64]) -> Self {
        Configuration(angles.to_vec())
    }
}

impl std::ops::Index<usize> for Configuration {
    type Output = f64;
    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// Candidate configurations per frame, in frame visitation order.
///
/// Produced once from input data and read-only thereafter. Candidate order
/// inside a frame is preserved for traceability and deterministic tie-breaks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CandidateSet {
    frames: Vec<Vec<Configuration>>,
    #[serde(skip)]
    dof: usize,
}

impl CandidateSet {
    /// Validates the nested input and fixes the joint count from the first
    /// candidate found. Rejects empty top level, inconsistent joint counts
    /// and non-finite values before anything downstream sees them.
    pub fn new(frames: Vec<Vec<Configuration>>) -> std::result::Result<Self, ValidationError> {
        if frames.is_empty() {
            return Err(ValidationError::EmptyCandidateSet);
        }
        let dof = frames
            .iter()
            .flat_map(|candidates| candidates.first())
            .map(Configuration::dof)
            .next()
            .ok_or(ValidationError::NoCandidates)?;
        for (frame, candidates) in frames.iter().enumerate() {
            for (candidate, config) in candidates.iter().enumerate() {
                if config.dof() != dof {
                    return Err(ValidationError::JointCountMismatch {
                        frame,
                        candidate,
                        expected: dof,
                        actual: config.dof(),
                    });
                }
                for (joint, angle) in config.angles().iter().enumerate() {
                    if !angle.is_finite() {
                        return Err(ValidationError::NonFiniteAngle {
                            frame,
                            candidate,
                            joint,
                        });
                    }
                }
            }
        }
        Ok(CandidateSet { frames, dof })
    }

    /// Build from raw nested angle lists, the shape of the JSON interface.
    pub fn from_raw(raw: Vec<Vec<Vec<f64>>>) -> std::result::Result<Self, ValidationError> {
        Self::new(
            raw.into_iter()
                .map(|candidates| candidates.into_iter().map(Configuration::from).collect())
                .collect(),
        )
    }

    pub(crate) fn from_validated(frames: Vec<Vec<Configuration>>, dof: usize) -> Self {
        CandidateSet { frames, dof }
    }

    /// Number of frames in the visitation sequence
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Total number of candidates across all frames
    pub fn num_candidates(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }

    pub fn frames(&self) -> &[Vec<Configuration>] {
        &self.frames
    }

    pub fn dof(&self) -> usize {
        self.dof
    }
}

/// Per-frame collision-free candidates, the output of the filter stage.
///
/// Always a subset of the normalized candidates, in the original candidate
/// order. A frame may be empty; that is reported, not hidden.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FilteredCandidateSet {
    frames: Vec<Vec<Configuration>>,
    #[serde(skip)]
    dof: usize,
}

impl FilteredCandidateSet {
    pub(crate) fn new(frames: Vec<Vec<Configuration>>, dof: usize) -> Self {
        FilteredCandidateSet { frames, dof }
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_candidates(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }

    pub fn frames(&self) -> &[Vec<Configuration>] {
        &self.frames
    }

    pub fn dof(&self) -> usize {
        self.dof
    }

    /// Indices of frames that kept no candidate
    pub fn empty_frames(&self) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, candidates)| candidates.is_empty())
            .map(|(index, _)| index)
            .collect()
    }
}
