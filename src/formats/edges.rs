//! edges.bin format - directed CSR graph with per-edge attributes
//!
//! Format (little-endian, mmap-friendly):
//!
//! Header (20 bytes):
//!   magic:                [8]u8 = "MMAPEDGE"
//!   num_nodes:            u32
//!   num_edges:            u32   // directed edges
//!   has_surface_primary:  u8 = 1
//!   has_mode_mask:        u8 = 1
//!   length_type:          u8 = 0  // f32 meters
//!   reserved:             u8 = 0
//!
//! Sizes block (20 bytes, for defensive parsing):
//!   five u32 counts: |offsets|, |neighbors|, |lengths|,
//!   |surface_primary|, |mode_mask|
//!
//! Arrays:
//!   offsets[num_nodes + 1]:       u32
//!   neighbors[num_edges]:         u32
//!   lengths_m[num_edges]:         f32
//!   surface_primary[num_edges]:   u8
//!   mode_mask[num_edges]:         u8   // bit0 = bike, bit1 = foot

use anyhow::{ensure, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const MAGIC: [u8; 8] = *b"MMAPEDGE";
/// Historical magic written by early builds; the loader still accepts it.
pub const MAGIC_LEGACY: [u8; 8] = *b"MMAPGRPH";
pub const HEADER_SIZE: usize = 20;
pub const SIZES_BLOCK_SIZE: usize = 20;

/// In-memory CSR arrays produced by the builder.
#[derive(Debug, Clone)]
pub struct EdgesBlob {
    pub num_nodes: u32,
    pub offsets: Vec<u32>,
    pub neighbors: Vec<u32>,
    pub lengths_m: Vec<f32>,
    pub surface_primary: Vec<u8>,
    pub mode_mask: Vec<u8>,
}

impl EdgesBlob {
    pub fn num_edges(&self) -> u32 {
        self.neighbors.len() as u32
    }
}

pub struct EdgesFile;

impl EdgesFile {
    /// Write edges.bin from a finished CSR blob.
    pub fn write<P: AsRef<Path>>(path: P, blob: &EdgesBlob) -> Result<()> {
        let num_edges = blob.num_edges();
        ensure!(
            blob.offsets.len() == blob.num_nodes as usize + 1,
            "offsets length {} does not match num_nodes + 1 = {}",
            blob.offsets.len(),
            blob.num_nodes + 1
        );
        ensure!(
            blob.lengths_m.len() == num_edges as usize
                && blob.surface_primary.len() == num_edges as usize
                && blob.mode_mask.len() == num_edges as usize,
            "edge attribute arrays disagree on edge count {}",
            num_edges
        );

        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&MAGIC)?;
        writer.write_all(&blob.num_nodes.to_le_bytes())?;
        writer.write_all(&num_edges.to_le_bytes())?;
        writer.write_all(&[1u8, 1, 0, 0])?; // has_surface_primary, has_mode_mask, length_type, reserved

        // sizes block
        writer.write_all(&(blob.offsets.len() as u32).to_le_bytes())?;
        writer.write_all(&(blob.neighbors.len() as u32).to_le_bytes())?;
        writer.write_all(&(blob.lengths_m.len() as u32).to_le_bytes())?;
        writer.write_all(&(blob.surface_primary.len() as u32).to_le_bytes())?;
        writer.write_all(&(blob.mode_mask.len() as u32).to_le_bytes())?;

        for &v in &blob.offsets {
            writer.write_all(&v.to_le_bytes())?;
        }
        for &v in &blob.neighbors {
            writer.write_all(&v.to_le_bytes())?;
        }
        for &v in &blob.lengths_m {
            writer.write_all(&v.to_le_bytes())?;
        }
        writer.write_all(&blob.surface_primary)?;
        writer.write_all(&blob.mode_mask)?;

        writer.flush()?;
        Ok(())
    }

    /// Total file size for the given counts, used by the loader's size check.
    pub fn expected_len(num_nodes: u32, num_edges: u32) -> usize {
        HEADER_SIZE
            + SIZES_BLOCK_SIZE
            + (num_nodes as usize + 1) * 4
            + num_edges as usize * 10
    }
}
