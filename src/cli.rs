//! CLI commands for tandem-route

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

use crate::astar::{route, QueryParams};
use crate::dijkstra;
use crate::engine::Engine;
use crate::graph::Graph;
use crate::ingest::{run_build, BuildConfig};

#[derive(Parser)]
#[command(name = "tandem-route")]
#[command(about = "Multimodal ride/walk routing over memory-mapped OSM graphs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build nodes.bin and edges.bin from an OSM PBF extract
    Build {
        /// Input OSM PBF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for the artifacts
        #[arg(short, long)]
        outdir: PathBuf,
    },

    /// Snap a coordinate to the nearest graph node
    Snap {
        /// Path to nodes.bin
        #[arg(long)]
        nodes: PathBuf,

        /// Path to edges.bin
        #[arg(long)]
        edges: PathBuf,

        /// Query latitude in decimal degrees
        #[arg(long)]
        lat: f64,

        /// Query longitude in decimal degrees
        #[arg(long)]
        lon: f64,
    },

    /// Route between two coordinates
    Route {
        /// Path to nodes.bin
        #[arg(long)]
        nodes: PathBuf,

        /// Path to edges.bin
        #[arg(long)]
        edges: PathBuf,

        #[arg(long)]
        from_lat: f64,

        #[arg(long)]
        from_lon: f64,

        #[arg(long)]
        to_lat: f64,

        #[arg(long)]
        to_lon: f64,

        /// Riding speed, meters per second
        #[arg(long, default_value = "6.0")]
        bike_speed: f64,

        /// Walking speed, meters per second
        #[arg(long, default_value = "1.5")]
        walk_speed: f64,

        /// Dismount penalty in seconds (negative disables the switch)
        #[arg(long, default_value = "5.0")]
        ride_to_walk: f64,

        /// Remount penalty in seconds (negative disables the switch)
        #[arg(long, default_value = "3.0")]
        walk_to_ride: f64,

        /// Soft penalty on non-preferred bike surfaces, seconds per km
        #[arg(long, default_value = "0.0")]
        surface_penalty: f64,

        /// Preferred-surface bitmask for riding (bit i = surface i)
        #[arg(long, default_value = "65535")]
        surface_mask: u16,
    },

    /// Cross-check A* against a reference Dijkstra on random pairs
    Validate {
        /// Path to nodes.bin
        #[arg(long)]
        nodes: PathBuf,

        /// Path to edges.bin
        #[arg(long)]
        edges: PathBuf,

        /// Number of random query pairs
        #[arg(long, default_value = "1000")]
        n_pairs: usize,

        /// Random seed
        #[arg(long, default_value = "42424242")]
        seed: u64,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Build { input, outdir } => {
                let result = run_build(BuildConfig { input, outdir })?;
                println!();
                println!(
                    "Build complete: {} nodes, {} directed edges",
                    result.num_nodes, result.num_edges
                );
                Ok(())
            }

            Commands::Snap { nodes, edges, lat, lon } => {
                let engine = Engine::load(&nodes, &edges).context("Failed to load engine")?;

                let idx = engine.nearest(lat, lon)?;
                let (node_lat, node_lon) = engine.get_node(idx)?;
                println!(
                    "nearest node: {} at ({:.6}, {:.6}), osm id {}",
                    idx, node_lat, node_lon, engine.view().nodes.ids[idx as usize]
                );
                Ok(())
            }

            Commands::Route {
                nodes,
                edges,
                from_lat,
                from_lon,
                to_lat,
                to_lon,
                bike_speed,
                walk_speed,
                ride_to_walk,
                walk_to_ride,
                surface_penalty,
                surface_mask,
            } => {
                let engine = Engine::load(&nodes, &edges).context("Failed to load engine")?;

                let source = engine.nearest(from_lat, from_lon)?;
                let target = engine.nearest(to_lat, to_lon)?;
                println!("snapped: {} -> {}", source, target);

                let params = QueryParams {
                    bike_surface_mask: surface_mask,
                    bike_speed_m_per_s: bike_speed,
                    walk_speed_m_per_s: walk_speed,
                    ride_to_walk_penalty_s: ride_to_walk,
                    walk_to_ride_penalty_s: walk_to_ride,
                    surface_penalty_s_per_km: surface_penalty,
                    ..QueryParams::default()
                };

                let result = engine.route_between(source, target, &params)?;
                if !result.success {
                    println!("no route found");
                    return Ok(());
                }

                println!(
                    "route: {} nodes, {:.0} m, {:.1} s",
                    result.nodes.len(),
                    result.distance_m,
                    result.duration_s
                );
                println!(
                    "  bike preferred: {:.0} m, bike non-preferred: {:.0} m, foot: {:.0} m",
                    result.distance_bike_preferred,
                    result.distance_bike_non_preferred,
                    result.distance_foot
                );
                Ok(())
            }

            Commands::Validate { nodes, edges, n_pairs, seed } => {
                let graph = Graph::load(&nodes, &edges).context("Failed to load graph")?;
                let view = graph.view();
                let num_nodes = graph.num_nodes();
                if num_nodes == 0 {
                    bail!("Graph is empty; nothing to validate");
                }

                // Bias off and factor tables empty: A* duration must
                // equal the reference Dijkstra exactly.
                let params = QueryParams {
                    surface_penalty_s_per_km: 0.0,
                    ..QueryParams::default()
                };

                let mut rng = StdRng::seed_from_u64(seed);
                let mut mismatches = 0usize;
                let mut reachable = 0usize;

                for i in 0..n_pairs {
                    let source = rng.gen_range(0..num_nodes);
                    let target = rng.gen_range(0..num_nodes);

                    let astar = route(&view.nodes, &view.edges, source, target, &params)?;
                    let reference = dijkstra::shortest_time(&view.edges, source, target, &params)?;

                    match (astar.success, reference) {
                        (true, Some(expected)) => {
                            reachable += 1;
                            let diff = (astar.duration_s - expected).abs();
                            let tolerance = 1e-6 * expected.max(1.0);
                            if diff > tolerance {
                                mismatches += 1;
                                eprintln!(
                                    "mismatch on pair {} ({} -> {}): astar {:.9}, dijkstra {:.9}",
                                    i, source, target, astar.duration_s, expected
                                );
                            }
                        }
                        (false, None) => {}
                        (astar_ok, _) => {
                            mismatches += 1;
                            eprintln!(
                                "reachability mismatch on pair {} ({} -> {}): astar {}, dijkstra {}",
                                i,
                                source,
                                target,
                                astar_ok,
                                reference.is_some()
                            );
                        }
                    }
                }

                println!(
                    "validated {} pairs ({} reachable): {} mismatches",
                    n_pairs, reachable, mismatches
                );
                if mismatches > 0 {
                    bail!("Validation failed with {} mismatches", mismatches);
                }
                Ok(())
            }
        }
    }
}
