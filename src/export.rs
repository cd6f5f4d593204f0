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
//! JSON boundary of the pipeline.
//!
//! The stages exchange typed in-memory artifacts; these readers/writers are
//! the optional persistence layer around them. The core never depends on
//! filenames, only on already-parsed values.
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::configuration::{CandidateSet, Configuration, FilteredCandidateSet};
use crate::errors::*;
use crate::solver::Path;

/// Winning path as persisted: one configuration per frame plus total cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDocument {
    pub total_cost: f64,
    pub configurations: Vec<Configuration>,
}

impl From<&Path> for PathDocument {
    fn from(path: &Path) -> Self {
        PathDocument {
            total_cost: path.total_cost,
            configurations: path.configurations.clone(),
        }
    }
}

/// Read the three-level nested candidate structure (frames, candidates,
/// joint angles) and validate it before any `Configuration` is built.
pub fn read_candidate_set<R: Read>(reader: R) -> Result<CandidateSet> {
    let raw: Vec<Vec<Vec<f64>>> = serde_json::from_reader(reader)?;
    Ok(CandidateSet::from_raw(raw).map_err(Error::Validation)?)
}

/// Auxiliary descriptive data about frames/solutions. Not consumed by the
/// planner, passed through for traceability.
pub fn read_metadata<R: Read>(reader: R) -> Result<serde_json::Value> {
    Ok(serde_json::from_reader(reader)?)
}

/// Serialize the winning path.
pub fn write_path<W: Write>(writer: W, path: &Path) -> Result<()> {
    serde_json::to_writer(writer, &PathDocument::from(path))?;
    Ok(())
}

/// Serialize the per-frame collision-free candidate sets, in the same nested
/// shape as the candidate input.
pub fn write_collision_free_solutions<W: Write>(
    writer: W,
    survivors: &FilteredCandidateSet,
) -> Result<()> {
    serde_json::to_writer(writer, survivors)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_set_round_trip() {
        let json = br#"[[[0.0, 1.0], [0.5, -1.0]], [[2.0, 2.0]]]"#;
        let set = read_candidate_set(&json[..]).unwrap();
        assert_eq!(set.num_frames(), 2);
        assert_eq!(set.dof(), 2);
        assert_eq!(set.frames()[0][1], Configuration::from(vec![0.5, -1.0]));
    }

    #[test]
    fn malformed_candidates_are_rejected_at_the_boundary() {
        let ragged = br#"[[[0.0, 1.0]], [[2.0]]]"#;
        assert!(matches!(
            read_candidate_set(&ragged[..]).unwrap_err(),
            Error::Validation(ValidationError::JointCountMismatch { .. })
        ));
        let not_numbers = br#"[[["a", "b"]]]"#;
        assert!(matches!(
            read_candidate_set(&not_numbers[..]).unwrap_err(),
            Error::Json(_)
        ));
    }

    #[test]
    fn path_document_round_trip() {
        let path = Path {
            selections: vec![0, 0],
            configurations: vec![
                Configuration::from(vec![0.0, 1.0]),
                Configuration::from(vec![1.0, 1.0]),
            ],
            total_cost: 1.0,
        };
        let mut buffer = Vec::new();
        write_path(&mut buffer, &path).unwrap();
        let document: PathDocument = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(document, PathDocument::from(&path));
    }

    #[test]
    fn collision_free_output_matches_input_shape() {
        let survivors = FilteredCandidateSet::new(
            vec![
                vec![Configuration::from(vec![0.0, 1.0])],
                vec![],
                vec![Configuration::from(vec![2.0, 3.0])],
            ],
            2,
        );
        let mut buffer = Vec::new();
        write_collision_free_solutions(&mut buffer, &survivors).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "[[[0.0,1.0]],[],[[2.0,3.0]]]"
        );
    }

    #[test]
    fn metadata_is_passed_through_opaque() {
        let json = br#"{"lift_height": 0.05, "robot_spawnpoint": [0, 0, 0]}"#;
        let metadata = read_metadata(&json[..]).unwrap();
        assert_eq!(metadata["lift_height"], 0.05);
    }
}
