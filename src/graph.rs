//! Read-only memory-mapped graph with zero-copy typed views
//!
//! `Graph::load` maps both artifacts, validates every header field and
//! the sizes block, and records array offsets. `Graph::view` hands out
//! borrowed slices pointing straight into the mapped pages; the borrow
//! ties every view to the mapping's lifetime, and the mapping itself is
//! immutable after load, so views can be shared across query threads
//! without synchronisation.

use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

use crate::error::EngineError;
use crate::formats::{edges, nodes};

/// Borrowed view over `nodes.bin`.
#[derive(Clone, Copy)]
pub struct NodesView<'a> {
    pub num_nodes: u32,
    pub ids: &'a [u64],
    pub lat: &'a [f32],
    pub lon: &'a [f32],
}

/// Borrowed view over `edges.bin` (CSR arrays).
#[derive(Clone, Copy)]
pub struct EdgesView<'a> {
    pub num_nodes: u32,
    pub num_edges: u32,
    pub offsets: &'a [u32],
    pub neighbors: &'a [u32],
    pub lengths_m: &'a [f32],
    pub surface_primary: &'a [u8],
    pub mode_mask: &'a [u8],
}

impl<'a> EdgesView<'a> {
    /// Half-open range of outgoing edge slots for node `u`.
    pub fn row(&self, u: u32) -> std::ops::Range<usize> {
        self.offsets[u as usize] as usize..self.offsets[u as usize + 1] as usize
    }
}

pub struct GraphView<'a> {
    pub nodes: NodesView<'a>,
    pub edges: EdgesView<'a>,
}

/// Owns the two mappings and the validated array layout.
#[derive(Debug)]
pub struct Graph {
    nodes_map: Mmap,
    edges_map: Mmap,
    num_nodes: u32,
    num_edges: u32,
}

impl Graph {
    pub fn load(nodes_path: &Path, edges_path: &Path) -> Result<Graph, EngineError> {
        let nodes_map = map_file(nodes_path)?;
        let edges_map = map_file(edges_path)?;

        let num_nodes = validate_nodes(&nodes_map)?;
        let num_edges = validate_edges(&edges_map, num_nodes)?;

        Ok(Graph {
            nodes_map,
            edges_map,
            num_nodes,
            num_edges,
        })
    }

    pub fn num_nodes(&self) -> u32 {
        self.num_nodes
    }

    pub fn num_edges(&self) -> u32 {
        self.num_edges
    }

    pub fn view(&self) -> GraphView<'_> {
        let n = self.num_nodes as usize;
        let e = self.num_edges as usize;

        let base = &self.nodes_map[nodes::HEADER_SIZE..];
        let nodes = NodesView {
            num_nodes: self.num_nodes,
            ids: cast_slice::<u64>(&base[..n * 8]),
            lat: cast_slice::<f32>(&base[n * 8..n * 12]),
            lon: cast_slice::<f32>(&base[n * 12..n * 16]),
        };

        let base = &self.edges_map[edges::HEADER_SIZE + edges::SIZES_BLOCK_SIZE..];
        let offsets_len = (n + 1) * 4;
        let edges = EdgesView {
            num_nodes: self.num_nodes,
            num_edges: self.num_edges,
            offsets: cast_slice::<u32>(&base[..offsets_len]),
            neighbors: cast_slice::<u32>(&base[offsets_len..offsets_len + e * 4]),
            lengths_m: cast_slice::<f32>(&base[offsets_len + e * 4..offsets_len + e * 8]),
            surface_primary: &base[offsets_len + e * 8..offsets_len + e * 9],
            mode_mask: &base[offsets_len + e * 9..offsets_len + e * 10],
        };

        GraphView { nodes, edges }
    }
}

fn map_file(path: &Path) -> Result<Mmap, EngineError> {
    let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    // SAFETY: read-only private mapping of a file we just opened. The
    // Mmap is owned by Graph, and every view borrows from it, so the
    // mapping outlives all pointers into it.
    unsafe { Mmap::map(&file) }.map_err(|e| EngineError::io(path, e))
}

/// Reinterpret a validated little-endian byte range as a typed slice.
/// All array offsets in both formats are multiples of the element
/// alignment relative to the page-aligned mapping base, which load-time
/// validation has already pinned down.
fn cast_slice<T: Copy>(bytes: &[u8]) -> &[T] {
    let size = std::mem::size_of::<T>();
    debug_assert_eq!(bytes.len() % size, 0);
    debug_assert_eq!(bytes.as_ptr().align_offset(std::mem::align_of::<T>()), 0);
    // SAFETY: length is an exact multiple of size_of::<T>, the pointer is
    // aligned (asserted above; guaranteed by the fixed header sizes), and
    // u32/u64/f32 accept any bit pattern.
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const T, bytes.len() / size) }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().expect("4-byte range"))
}

fn validate_nodes(map: &Mmap) -> Result<u32, EngineError> {
    if map.len() < nodes::HEADER_SIZE {
        return Err(EngineError::BadFormat(format!(
            "nodes.bin truncated: {} bytes, header needs {}",
            map.len(),
            nodes::HEADER_SIZE
        )));
    }
    if map[0..8] != nodes::MAGIC {
        return Err(EngineError::BadFormat(format!(
            "nodes.bin magic: expected \"MMAPNODE\", got {:?}",
            &map[0..8]
        )));
    }
    let num_nodes = read_u32(map, 8);
    let expected = nodes::NodesFile::expected_len(num_nodes);
    if map.len() != expected {
        return Err(EngineError::BadFormat(format!(
            "nodes.bin size: expected {} bytes for {} nodes, got {}",
            expected,
            num_nodes,
            map.len()
        )));
    }
    Ok(num_nodes)
}

fn validate_edges(map: &Mmap, nodes_num_nodes: u32) -> Result<u32, EngineError> {
    let header_and_sizes = edges::HEADER_SIZE + edges::SIZES_BLOCK_SIZE;
    if map.len() < header_and_sizes {
        return Err(EngineError::BadFormat(format!(
            "edges.bin truncated: {} bytes, header and sizes block need {}",
            map.len(),
            header_and_sizes
        )));
    }
    if map[0..8] != edges::MAGIC && map[0..8] != edges::MAGIC_LEGACY {
        return Err(EngineError::BadFormat(format!(
            "edges.bin magic: expected \"MMAPEDGE\", got {:?}",
            &map[0..8]
        )));
    }

    let num_nodes = read_u32(map, 8);
    let num_edges = read_u32(map, 12);
    if num_nodes != nodes_num_nodes {
        return Err(EngineError::BadFormat(format!(
            "edges.bin num_nodes: {} does not match nodes.bin ({})",
            num_nodes, nodes_num_nodes
        )));
    }

    let (has_surface, has_mode, length_type) = (map[16], map[17], map[18]);
    if has_surface != 1 {
        return Err(EngineError::BadFormat(format!(
            "edges.bin has_surface_primary: expected 1, got {}",
            has_surface
        )));
    }
    if has_mode != 1 {
        return Err(EngineError::BadFormat(format!(
            "edges.bin has_mode_mask: expected 1, got {}",
            has_mode
        )));
    }
    if length_type != 0 {
        return Err(EngineError::BadFormat(format!(
            "edges.bin length_type: expected 0 (f32 meters), got {}",
            length_type
        )));
    }

    // Sizes block: every count must equal its expected value.
    let expectations = [
        ("offsets", num_nodes + 1),
        ("neighbors", num_edges),
        ("lengths", num_edges),
        ("surface_primary", num_edges),
        ("mode_mask", num_edges),
    ];
    for (i, (field, expected)) in expectations.iter().enumerate() {
        let got = read_u32(map, edges::HEADER_SIZE + i * 4);
        if got != *expected {
            return Err(EngineError::BadFormat(format!(
                "edges.bin sizes block: {} count {} != expected {}",
                field, got, expected
            )));
        }
    }

    let expected = edges::EdgesFile::expected_len(num_nodes, num_edges);
    if map.len() != expected {
        return Err(EngineError::BadFormat(format!(
            "edges.bin size: expected {} bytes for {} nodes / {} edges, got {}",
            expected,
            num_nodes,
            num_edges,
            map.len()
        )));
    }

    // Endpoint invariants on the offsets array itself.
    let offsets_at = header_and_sizes;
    let first = read_u32(map, offsets_at);
    if first != 0 {
        return Err(EngineError::BadFormat(format!(
            "edges.bin offsets[0]: expected 0, got {}",
            first
        )));
    }
    let last = read_u32(map, offsets_at + num_nodes as usize * 4);
    if last != num_edges {
        return Err(EngineError::BadFormat(format!(
            "edges.bin offsets[num_nodes]: expected num_edges {}, got {}",
            num_edges, last
        )));
    }

    Ok(num_edges)
}
