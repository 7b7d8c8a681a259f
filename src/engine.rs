//! Serve-time facade: load once, query from any thread
//!
//! Bundles the mapped graph and the spatial index behind one handle.
//! The host loads an `Engine` at startup and then only ever reads from
//! it; a query snaps its endpoints and runs the search against fresh
//! views, all per-query state living on the query's own stack.

use std::path::Path;

use crate::astar::{route, QueryParams, RouteResult};
use crate::error::EngineError;
use crate::graph::{Graph, GraphView};
use crate::spatial::KdTree;

pub struct Engine {
    graph: Graph,
    kd: KdTree,
}

impl Engine {
    /// Map both artifacts and build the spatial index. Any validation
    /// failure here prevents the engine from serving at all.
    pub fn load(nodes_path: &Path, edges_path: &Path) -> Result<Engine, EngineError> {
        let graph = Graph::load(nodes_path, edges_path)?;
        let kd = KdTree::build(&graph.view().nodes);
        Ok(Engine { graph, kd })
    }

    pub fn num_nodes(&self) -> u32 {
        self.graph.num_nodes()
    }

    pub fn num_edges(&self) -> u32 {
        self.graph.num_edges()
    }

    pub fn view(&self) -> GraphView<'_> {
        self.graph.view()
    }

    /// Snap a coordinate to the nearest graph node.
    pub fn nearest(&self, lat: f64, lon: f64) -> Result<u32, EngineError> {
        self.kd.nearest(lat, lon)
    }

    /// Coordinates of a graph node.
    pub fn get_node(&self, index: u32) -> Result<(f32, f32), EngineError> {
        self.kd.get_node(index)
    }

    /// Time-optimal multimodal route between two node indices.
    pub fn route_between(
        &self,
        source: u32,
        target: u32,
        params: &QueryParams,
    ) -> Result<RouteResult, EngineError> {
        let view = self.graph.view();
        route(&view.nodes, &view.edges, source, target, params)
    }
}
