//! nodes.bin format - node ids and coordinates
//!
//! Format (little-endian, mmap-friendly):
//!
//! Header (16 bytes):
//!   magic:      [8]u8 = "MMAPNODE"
//!   num_nodes:  u32
//!   reserved:   u32 = 0
//!
//! Arrays:
//!   ids[num_nodes]:  u64   // original OSM ids, informational
//!   lat[num_nodes]:  f32   // decimal degrees
//!   lon[num_nodes]:  f32   // decimal degrees

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const MAGIC: [u8; 8] = *b"MMAPNODE";
pub const HEADER_SIZE: usize = 16;

pub struct NodesFile;

impl NodesFile {
    /// Write nodes.bin. `ids`, `lat`, and `lon` are parallel arrays.
    pub fn write<P: AsRef<Path>>(path: P, ids: &[u64], lat: &[f32], lon: &[f32]) -> Result<()> {
        assert_eq!(ids.len(), lat.len());
        assert_eq!(ids.len(), lon.len());

        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&MAGIC)?;
        writer.write_all(&(ids.len() as u32).to_le_bytes())?;
        writer.write_all(&0u32.to_le_bytes())?; // reserved

        for &id in ids {
            writer.write_all(&id.to_le_bytes())?;
        }
        for &v in lat {
            writer.write_all(&v.to_le_bytes())?;
        }
        for &v in lon {
            writer.write_all(&v.to_le_bytes())?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Total file size for a node count, used by the loader's size check.
    pub fn expected_len(num_nodes: u32) -> usize {
        HEADER_SIZE + num_nodes as usize * 16
    }
}
