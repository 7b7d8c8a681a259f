//! Binary artifact formats emitted by the builder
//!
//! Two flat little-endian blobs, laid out so the loader can map them
//! read-only and point typed views straight into the pages.

pub mod edges;
pub mod nodes;

pub use edges::{EdgesBlob, EdgesFile};
pub use nodes::NodesFile;
