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
use std::time::Instant;

use crate::configuration::{Configuration, FilteredCandidateSet};
use crate::errors::*;

/// Joint-space distance used as edge cost.
///
/// The weighting is a policy, not a constant: actuator cost or nonlinear
/// penalties go behind this trait.
pub trait JointSpaceMetric {
    fn distance(&self, from: &[f64], to: &[f64]) -> f64;
}

/// Weighted sum of absolute per-joint differences (weighted L1 norm).
/// The L1 norm reflects total joint movement better than the Euclidean norm.
#[derive(Debug, Clone, Default)]
pub struct WeightedL1 {
    weights: Option<Vec<f64>>,
}

impl WeightedL1 {
    /// Uniform weights
    pub fn uniform() -> Self {
        WeightedL1 { weights: None }
    }

    /// Per-joint weights reflecting actuator cost
    pub fn with_weights(weights: Vec<f64>) -> Self {
        WeightedL1 {
            weights: Some(weights),
        }
    }
}

impl JointSpaceMetric for WeightedL1 {
    fn distance(&self, from: &[f64], to: &[f64]) -> f64 {
        debug_assert_eq!(from.len(), to.len());
        match &self.weights {
            Some(weights) => from
                .iter()
                .zip(to)
                .zip(weights)
                .map(|((a, b), w)| w * (a - b).abs())
                .sum(),
            None => from.iter().zip(to).map(|(a, b)| (a - b).abs()).sum(),
        }
    }
}

/// Layered directed graph over surviving candidates.
///
/// Layer `i` holds the collision-free configurations of frame `i`; edges run
/// only between consecutive layers and carry the joint-space distance. The
/// virtual source edge weights to layer 0 come from the start configuration
/// when one is known, otherwise they are all zero.
#[derive(Debug)]
pub struct MotionGraph {
    layers: Vec<Vec<Configuration>>,
    // edges[i][a][b]: layer i node a -> layer i+1 node b
    edges: Vec<Vec<Vec<f64>>>,
    source: Vec<f64>,
}

impl MotionGraph {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> &[Configuration] {
        &self.layers[index]
    }

    pub fn num_nodes(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    pub fn num_edges(&self) -> usize {
        self.edges
            .iter()
            .map(|layer| layer.iter().map(Vec::len).sum::<usize>())
            .sum()
    }

    /// Weight of the edge from node `a` of layer `index` to node `b` of the
    /// next layer
    pub fn edge_weight(&self, index: usize, a: usize, b: usize) -> f64 {
        self.edges[index][a][b]
    }

    /// Weight of the virtual source edge into node `a` of layer 0
    pub fn source_weight(&self, a: usize) -> f64 {
        self.source[a]
    }
}

/// Builds a `MotionGraph` from the per-frame surviving candidates.
pub struct MotionGraphBuilder<M = WeightedL1> {
    metric: M,
    start: Option<Configuration>,
}

impl Default for MotionGraphBuilder<WeightedL1> {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionGraphBuilder<WeightedL1> {
    pub fn new() -> Self {
        MotionGraphBuilder {
            metric: WeightedL1::uniform(),
            start: None,
        }
    }
}

impl<M> MotionGraphBuilder<M>
where
    M: JointSpaceMetric,
{
    /// Replace the edge weighting policy
    pub fn metric<M2: JointSpaceMetric>(self, metric: M2) -> MotionGraphBuilder<M2> {
        MotionGraphBuilder {
            metric,
            start: self.start,
        }
    }

    /// Configuration the arm occupies before motion begins. Its distance to
    /// each layer-0 node becomes the virtual source edge weight.
    pub fn start_configuration(mut self, start: Configuration) -> Self {
        self.start = Some(start);
        self
    }

    /// Build the layered graph.
    ///
    /// A frame with zero surviving candidates makes a complete path
    /// impossible; all such frames are reported in one `InfeasibleFrames`
    /// error instead of producing a graph with a gap.
    pub fn build(&self, survivors: &FilteredCandidateSet) -> Result<MotionGraph> {
        let started = Instant::now();
        if survivors.num_frames() == 0 {
            return Err(ValidationError::EmptyCandidateSet.into());
        }
        let empty = survivors.empty_frames();
        if !empty.is_empty() {
            return Err(Error::InfeasibleFrames { frames: empty });
        }
        if let Some(start) = &self.start {
            if start.dof() != survivors.dof() {
                return Err(ValidationError::DofMismatch {
                    expected: survivors.dof(),
                    actual: start.dof(),
                }
                .into());
            }
        }
        let layers: Vec<Vec<Configuration>> = survivors.frames().to_vec();
        let source = match &self.start {
            Some(start) => layers[0]
                .iter()
                .map(|node| self.metric.distance(start.angles(), node.angles()))
                .collect(),
            None => vec![0.0; layers[0].len()],
        };
        let edges = layers
            .windows(2)
            .map(|pair| {
                pair[0]
                    .iter()
                    .map(|from| {
                        pair[1]
                            .iter()
                            .map(|to| self.metric.distance(from.angles(), to.angles()))
                            .collect()
                    })
                    .collect()
            })
            .collect();
        let graph = MotionGraph {
            layers,
            edges,
            source,
        };
        info!(
            "graph construction took {:.3}s for {} frames with {} nodes and {} edges",
            started.elapsed().as_secs_f64(),
            graph.num_layers(),
            graph.num_nodes(),
            graph.num_edges(),
        );
        Ok(graph)
    }
}
