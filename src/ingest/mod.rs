//! PBF ingestion - two passes over the extract, then CSR construction
//!
//! Pass 1 streams ways and keeps the ones `way_filter` admits, together
//! with their ordered node-id lists. Pass 2 streams nodes and collects
//! coordinates for exactly the referenced ids. Compaction sorts the
//! retained ids ascending and assigns dense indices; CSR construction
//! counts directed slots, prefix-sums, then fills the attribute arrays.

pub mod way_filter;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use osmpbf::{Element, ElementReader};
use serde::Serialize;
use sha2::{Digest as Sha2Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::formats::{EdgesBlob, EdgesFile, NodesFile};
use crate::geo::haversine_meters;
use crate::surface::{MODE_BIKE, MODE_FOOT};
use way_filter::{classify_way, WayMeta};

pub struct BuildConfig {
    pub input: PathBuf,
    pub outdir: PathBuf,
}

pub struct BuildResult {
    pub num_nodes: u32,
    pub num_edges: u32,
    pub nodes_bin: PathBuf,
    pub edges_bin: PathBuf,
    pub lock_file: PathBuf,
}

/// Provenance record written next to the artifacts. Informational only;
/// the loader never reads it.
#[derive(Serialize)]
struct BuildLock {
    input: String,
    input_sha256: String,
    num_nodes: u32,
    num_edges: u32,
    nodes_bin: String,
    edges_bin: String,
    created_at_utc: String,
}

/// Run the full build: PBF extract in, `nodes.bin` + `edges.bin` +
/// `build.lock.json` out.
pub fn run_build(config: BuildConfig) -> Result<BuildResult> {
    println!("Building graph from {}", config.input.display());
    std::fs::create_dir_all(&config.outdir)
        .with_context(|| format!("Failed to create {}", config.outdir.display()))?;

    let input_sha256 = compute_file_sha256(&config.input)?;
    info!("input sha256 = {}", hex::encode(input_sha256));

    println!("Pass 1/2: scanning ways...");
    let ways = collect_ways(&config.input)?;
    println!("  ✓ {} candidate ways", ways.len());

    let mut needed: HashSet<i64> = HashSet::new();
    for (node_ids, _) in &ways {
        needed.extend(node_ids.iter().copied());
    }

    println!("Pass 2/2: collecting coordinates for {} nodes...", needed.len());
    let coords = collect_coords(&config.input, &needed)?;
    println!("  ✓ {} node coordinates", coords.len());

    // Compaction: dense indices in ascending id order, for determinism.
    let mut all_ids: Vec<i64> = coords.keys().copied().collect();
    all_ids.sort_unstable();
    let num_nodes = all_ids.len() as u32;

    let mut id_to_idx: HashMap<i64, u32> = HashMap::with_capacity(all_ids.len());
    for (i, &id) in all_ids.iter().enumerate() {
        id_to_idx.insert(id, i as u32);
    }

    let blob = build_csr(num_nodes, &ways, &id_to_idx, &coords);
    let num_edges = blob.num_edges();
    println!("  ✓ CSR: {} nodes, {} directed edges", num_nodes, num_edges);

    let nodes_bin = config.outdir.join("nodes.bin");
    let edges_bin = config.outdir.join("edges.bin");

    let ids: Vec<u64> = all_ids.iter().map(|&id| id as u64).collect();
    let (lat, lon): (Vec<f32>, Vec<f32>) = all_ids
        .iter()
        .map(|id| coords[id])
        .unzip();

    NodesFile::write(&nodes_bin, &ids, &lat, &lon)?;
    println!("  ✓ Wrote {}", nodes_bin.display());

    EdgesFile::write(&edges_bin, &blob)?;
    println!("  ✓ Wrote {}", edges_bin.display());

    let lock_file = config.outdir.join("build.lock.json");
    let lock = BuildLock {
        input: config.input.display().to_string(),
        input_sha256: hex::encode(input_sha256),
        num_nodes,
        num_edges,
        nodes_bin: nodes_bin.display().to_string(),
        edges_bin: edges_bin.display().to_string(),
        created_at_utc: chrono::Utc::now().to_rfc3339(),
    };
    std::fs::write(&lock_file, serde_json::to_string_pretty(&lock)?)
        .with_context(|| format!("Failed to write {}", lock_file.display()))?;
    println!("  ✓ Wrote {}", lock_file.display());

    Ok(BuildResult {
        num_nodes,
        num_edges,
        nodes_bin,
        edges_bin,
        lock_file,
    })
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("Failed to create progress style"),
    );
    pb.set_message(message);
    pb
}

/// Pass 1: retained ways as (ordered node ids, metadata).
fn collect_ways<P: AsRef<Path>>(path: P) -> Result<Vec<(Vec<i64>, WayMeta)>> {
    let reader = ElementReader::from_path(path.as_ref())
        .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;

    let pb = spinner("scanning ways");
    let mut ways: Vec<(Vec<i64>, WayMeta)> = Vec::new();
    let mut seen = 0u64;

    reader
        .for_each(|element| {
            if let Element::Way(way) = element {
                seen += 1;
                if seen % 100_000 == 0 {
                    pb.set_message(format!("scanning ways ({} seen, {} kept)", seen, ways.len()));
                    pb.tick();
                }
                let tags: Vec<(&str, &str)> = way.tags().collect();
                if let Some(meta) = classify_way(&tags) {
                    ways.push((way.refs().collect(), meta));
                }
            }
        })
        .with_context(|| format!("Failed to read ways from {}", path.as_ref().display()))?;

    pb.finish_and_clear();
    Ok(ways)
}

/// Pass 2: coordinates for referenced nodes only, as f32 degrees.
fn collect_coords<P: AsRef<Path>>(
    path: P,
    needed: &HashSet<i64>,
) -> Result<HashMap<i64, (f32, f32)>> {
    let reader = ElementReader::from_path(path.as_ref())
        .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;

    let pb = spinner("collecting coordinates");
    let mut coords: HashMap<i64, (f32, f32)> = HashMap::with_capacity(needed.len());
    let mut seen = 0u64;

    reader
        .for_each(|element| {
            let (id, lat, lon) = match element {
                Element::Node(node) => (node.id(), node.lat(), node.lon()),
                Element::DenseNode(node) => (node.id(), node.lat(), node.lon()),
                _ => return,
            };
            seen += 1;
            if seen % 1_000_000 == 0 {
                pb.set_message(format!("collecting coordinates ({} kept)", coords.len()));
                pb.tick();
            }
            if needed.contains(&id) {
                coords.insert(id, (lat as f32, lon as f32));
            }
        })
        .with_context(|| format!("Failed to read nodes from {}", path.as_ref().display()))?;

    pb.finish_and_clear();

    if coords.len() != needed.len() {
        bail!(
            "extract references {} nodes but only {} carry coordinates",
            needed.len(),
            coords.len()
        );
    }
    Ok(coords)
}

/// CSR construction: count directed slots per source, prefix-sum into
/// offsets, then fill the parallel arrays with a cursor copy.
fn build_csr(
    num_nodes: u32,
    ways: &[(Vec<i64>, WayMeta)],
    id_to_idx: &HashMap<i64, u32>,
    coords: &HashMap<i64, (f32, f32)>,
) -> EdgesBlob {
    let mut offsets = vec![0u32; num_nodes as usize + 1];

    for (node_ids, meta) in ways {
        for pair in node_ids.windows(2) {
            let (id_u, id_v) = (pair[0], pair[1]);
            if id_u == id_v {
                continue;
            }
            let (Some(&u), Some(&v)) = (id_to_idx.get(&id_u), id_to_idx.get(&id_v)) else {
                continue;
            };
            if meta.bike_fwd || meta.foot_allowed {
                offsets[u as usize + 1] += 1;
            }
            if meta.bike_back || meta.foot_allowed {
                offsets[v as usize + 1] += 1;
            }
        }
    }

    for i in 1..offsets.len() {
        offsets[i] += offsets[i - 1];
    }
    let num_edges = offsets[num_nodes as usize] as usize;

    let mut neighbors = vec![0u32; num_edges];
    let mut lengths_m = vec![0f32; num_edges];
    let mut surface_primary = vec![0u8; num_edges];
    let mut mode_mask = vec![0u8; num_edges];
    let mut cursor = offsets.clone();

    for (node_ids, meta) in ways {
        for pair in node_ids.windows(2) {
            let (id_u, id_v) = (pair[0], pair[1]);
            if id_u == id_v {
                continue;
            }
            let (Some(&u), Some(&v)) = (id_to_idx.get(&id_u), id_to_idx.get(&id_v)) else {
                continue;
            };

            let (lat_u, lon_u) = coords[&id_u];
            let (lat_v, lon_v) = coords[&id_v];
            let dist = haversine_meters(lat_u as f64, lon_u as f64, lat_v as f64, lon_v as f64)
                as f32;

            if meta.bike_fwd || meta.foot_allowed {
                let slot = cursor[u as usize] as usize;
                cursor[u as usize] += 1;
                neighbors[slot] = v;
                lengths_m[slot] = dist;
                surface_primary[slot] = meta.surface as u8;
                let mut mask = 0u8;
                if meta.bike_fwd {
                    mask |= MODE_BIKE;
                }
                if meta.foot_allowed {
                    mask |= MODE_FOOT;
                }
                mode_mask[slot] = mask;
            }
            if meta.bike_back || meta.foot_allowed {
                let slot = cursor[v as usize] as usize;
                cursor[v as usize] += 1;
                neighbors[slot] = u;
                lengths_m[slot] = dist;
                surface_primary[slot] = meta.surface as u8;
                let mut mask = 0u8;
                if meta.bike_back {
                    mask |= MODE_BIKE;
                }
                if meta.foot_allowed {
                    mask |= MODE_FOOT;
                }
                mode_mask[slot] = mask;
            }
        }
    }

    EdgesBlob {
        num_nodes,
        offsets,
        neighbors,
        lengths_m,
        surface_primary,
        mode_mask,
    }
}

/// SHA-256 of a file, streamed in 8 KiB chunks.
fn compute_file_sha256<P: AsRef<Path>>(path: P) -> Result<[u8; 32]> {
    use std::io::Read;

    let mut file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("Failed to open {} for hashing", path.as_ref().display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    Ok(hash)
}
