//! Tandem-Route: multimodal ride/walk routing over memory-mapped OSM graphs
//!
//! Pipeline:
//! - Build: stream an OSM PBF extract twice, derive per-edge mode bits and
//!   surface codes, emit `nodes.bin` + `edges.bin` in CSR form
//! - Load: mmap both artifacts read-only and hand out zero-copy typed views
//! - Snap: packed KD-tree over node coordinates for nearest-node queries
//! - Query: two-layer A* (RIDE/WALK) with surface-aware edge costs, a soft
//!   preference bias on non-preferred bike surfaces, and mode-switch arcs
//!
//! The graph is immutable after load; queries share it read-only and own
//! only their per-query scratch, so any number can run in parallel.

pub mod astar;
pub mod cli;
pub mod dijkstra;
pub mod engine;
pub mod error;
pub mod formats;
pub mod geo;
pub mod graph;
pub mod ingest;
pub mod spatial;
pub mod surface;

pub use astar::{route, Layer, QueryParams, RouteResult};
pub use engine::Engine;
pub use error::EngineError;
pub use graph::{EdgesView, Graph, GraphView, NodesView};
pub use spatial::KdTree;
pub use surface::{StepLabel, SurfacePrimary, MODE_BIKE, MODE_FOOT};
