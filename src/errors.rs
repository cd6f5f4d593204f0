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
use thiserror::Error;

/// Error for `sprocket`
#[derive(Debug, Error)]
pub enum Error {
    #[error("input validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// One or more frames kept no collision-free candidate. Planning for the
    /// whole sequence fails; the frames are never silently skipped.
    #[error("{} frame(s) without any collision-free configuration: {frames:?}", frames.len())]
    InfeasibleFrames { frames: Vec<usize> },
    #[error("collision oracle failed: {0}")]
    Oracle(#[from] OracleError),
    /// The layered graph was internally inconsistent. This is an invariant
    /// violation, not an expected runtime condition.
    #[error("solver invariant violated: {0}")]
    Solver(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Malformed input, rejected before any processing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("candidate set has no frames")]
    EmptyCandidateSet,
    #[error("candidate set has no configurations at all")]
    NoCandidates,
    #[error("frame {frame} candidate {candidate} has {actual} joints, expected {expected}")]
    JointCountMismatch {
        frame: usize,
        candidate: usize,
        expected: usize,
        actual: usize,
    },
    #[error("frame {frame} candidate {candidate} joint {joint} is not a finite number")]
    NonFiniteAngle {
        frame: usize,
        candidate: usize,
        joint: usize,
    },
    #[error("expected {expected} per-joint values, got {actual}")]
    DofMismatch { expected: usize, actual: usize },
}

/// Failure of the collision backend on a single query.
///
/// Kept distinct from a genuine collision so callers can tell "rejected by
/// geometry" from "could not evaluate".
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("collision backend error: {0}")]
    Backend(String),
    #[error("unsupported geometry pair: {0}")]
    UnsupportedGeometry(String),
    #[error("collision query took {elapsed_ms} ms, budget is {limit_ms} ms")]
    Timeout { limit_ms: u64, elapsed_ms: u64 },
}

/// Result for `sprocket`
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for OracleError {
    fn from(error: String) -> OracleError {
        OracleError::Backend(error)
    }
}

impl<'a> From<&'a str> for OracleError {
    fn from(error: &'a str) -> OracleError {
        OracleError::Backend(error.to_owned())
    }
}
