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

use crate::configuration::Configuration;
use crate::errors::*;
use crate::graph::MotionGraph;

/// One configuration per frame, in frame order, with the total joint-space
/// cost of moving through them (including the source edge when the graph was
/// built with a start configuration).
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Selected node index per layer, in the layer's candidate order
    pub selections: Vec<usize>,
    pub configurations: Vec<Configuration>,
    pub total_cost: f64,
}

impl Path {
    pub fn num_frames(&self) -> usize {
        self.configurations.len()
    }
}

/// Minimum-cost path through the layered graph, one node per layer.
///
/// Forward dynamic programming: the cumulative cost of a node is the minimum
/// over its predecessors of their cumulative cost plus the edge weight, with
/// a back-pointer for reconstruction. Runs in O(Σ |Lᵢ|·|Lᵢ₊₁|). When several
/// predecessors tie, the one earliest in its layer's candidate order wins, so
/// identical input always yields an identical path.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestPathSolver;

impl ShortestPathSolver {
    pub fn new() -> Self {
        ShortestPathSolver
    }

    /// The builder refuses empty layers, so hitting one here (or failing to
    /// reach the last layer) is an invariant violation reported as
    /// `Error::Solver`, never a partial path.
    pub fn solve(&self, graph: &MotionGraph) -> Result<Path> {
        let started = Instant::now();
        let num_layers = graph.num_layers();
        if num_layers == 0 {
            return Err(Error::Solver("graph has no layers".to_owned()));
        }
        let mut cost: Vec<f64> = (0..graph.layer(0).len())
            .map(|node| graph.source_weight(node))
            .collect();
        if cost.is_empty() {
            return Err(Error::Solver("layer 0 has no nodes".to_owned()));
        }
        let mut back_pointers: Vec<Vec<usize>> = Vec::with_capacity(num_layers - 1);
        for layer in 1..num_layers {
            let layer_len = graph.layer(layer).len();
            if layer_len == 0 {
                return Err(Error::Solver(format!("layer {layer} has no nodes")));
            }
            let prev_len = graph.layer(layer - 1).len();
            let mut next_cost = Vec::with_capacity(layer_len);
            let mut pointers = Vec::with_capacity(layer_len);
            for to in 0..layer_len {
                let mut best = f64::INFINITY;
                let mut best_from = 0;
                for from in 0..prev_len {
                    let candidate = cost[from] + graph.edge_weight(layer - 1, from, to);
                    // strict comparison keeps the earliest predecessor on ties
                    if candidate < best {
                        best = candidate;
                        best_from = from;
                    }
                }
                next_cost.push(best);
                pointers.push(best_from);
            }
            cost = next_cost;
            back_pointers.push(pointers);
        }
        // virtual sink: zero-weight edges from every node of the last layer
        let mut total_cost = f64::INFINITY;
        let mut selected = 0;
        for (node, &c) in cost.iter().enumerate() {
            if c < total_cost {
                total_cost = c;
                selected = node;
            }
        }
        if !total_cost.is_finite() {
            return Err(Error::Solver(
                "no finite-cost path through non-empty layers".to_owned(),
            ));
        }
        let mut selections = vec![0; num_layers];
        selections[num_layers - 1] = selected;
        for layer in (1..num_layers).rev() {
            selections[layer - 1] = back_pointers[layer - 1][selections[layer]];
        }
        let configurations = selections
            .iter()
            .enumerate()
            .map(|(layer, &node)| graph.layer(layer)[node].clone())
            .collect();
        info!(
            "shortest path over {} layers found in {:.3}s, length: {}",
            num_layers,
            started.elapsed().as_secs_f64(),
            total_cost,
        );
        Ok(Path {
            selections,
            configurations,
            total_cost,
        })
    }
}
