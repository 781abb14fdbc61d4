//! Named coordinate conventions.
//!
//! Maintains a directed graph of named conventions (e.g. `"visual3d"`,
//! `"opensim"`) and the [`AxisRemap`]s that relate them.  Given any two
//! convention names the graph composes the remaps along the shortest chain
//! via BFS.
//!
//! # Example
//!
//! ```rust
//! use trcbridge_transform::{AxisRemap, ConventionGraph};
//!
//! let graph = ConventionGraph::builtin();
//! let remap = graph.lookup("visual3d", "opensim").unwrap();
//! assert_eq!(remap, AxisRemap::Z_UP_TO_Y_UP);
//!
//! // Chains compose: a lab frame rotated 90° about the vertical axis.
//! let mut graph = ConventionGraph::builtin();
//! graph.set_remap("lab", "visual3d", "-y,x,z".parse().unwrap());
//! let chained = graph.lookup("lab", "opensim").unwrap();
//! assert_eq!(chained.apply([1.0, 0.0, 0.0]), [0.0, 0.0, -1.0]);
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::remap::AxisRemap;

/// Capture-side convention of the biomechanics export tool (Z up).
pub const VISUAL3D: &str = "visual3d";
/// Simulation-side convention (Y up).
pub const OPENSIM: &str = "opensim";

/// Directed graph of named conventions; edges carry the remap from the
/// source convention into the target one.
#[derive(Debug, Default, Clone)]
pub struct ConventionGraph {
    /// `edges[from][to] = AxisRemap`
    edges: BTreeMap<String, BTreeMap<String, AxisRemap>>,
}

impl ConventionGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph with the capture → simulation conventions registered in both
    /// directions.
    pub fn builtin() -> Self {
        let mut graph = Self::new();
        graph.set_remap(VISUAL3D, OPENSIM, AxisRemap::Z_UP_TO_Y_UP);
        graph.set_remap(OPENSIM, VISUAL3D, AxisRemap::Z_UP_TO_Y_UP.inverse());
        graph
    }

    /// Register or replace the remap from `from` to `to`.  Edges are
    /// directional; the inverse is not added automatically.
    pub fn set_remap(&mut self, from: &str, to: &str, remap: AxisRemap) {
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string(), remap);
    }

    /// Names of every convention that appears in the graph, sorted.
    pub fn conventions(&self) -> Vec<String> {
        self.edges
            .iter()
            .flat_map(|(from, tos)| std::iter::once(from.clone()).chain(tos.keys().cloned()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Composed remap taking coordinates in `from` into `to`.
    ///
    /// Returns `None` if no chain of edges connects the two.  Among equally
    /// short chains, the one through the alphabetically first conventions
    /// wins.
    pub fn lookup(&self, from: &str, to: &str) -> Option<AxisRemap> {
        if from == to {
            return Some(AxisRemap::IDENTITY);
        }

        let mut queue: VecDeque<(&str, AxisRemap)> = VecDeque::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();

        queue.push_back((from, AxisRemap::IDENTITY));
        visited.insert(from);

        while let Some((current, accumulated)) = queue.pop_front() {
            let Some(neighbours) = self.edges.get(current) else {
                continue;
            };
            for (next, edge) in neighbours {
                if !visited.insert(next.as_str()) {
                    continue;
                }
                let composed = accumulated.compose(*edge);
                if next == to {
                    return Some(composed);
                }
                queue.push_back((next.as_str(), composed));
            }
        }

        None
    }
}
