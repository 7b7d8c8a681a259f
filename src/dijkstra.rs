//! Reference search used to validate the A* implementation
//!
//! A plain Dijkstra over the same doubled RIDE/WALK state space with the
//! same edge-weight model but no heuristic and no surface bias. With the
//! bias at zero the A* duration must match this to the last bit of
//! floating-point noise; the `validate` command and the optimality tests
//! lean on that.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::astar::{Layer, QueryParams};
use crate::error::EngineError;
use crate::graph::EdgesView;
use crate::surface::{MODE_BIKE, MODE_FOOT};

struct HeapEntry {
    time: f64,
    state: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.partial_cmp(&self.time).unwrap_or(Ordering::Equal)
    }
}

fn surface_factor(factors: &[f64], surface: u8) -> f64 {
    match factors.get(surface as usize) {
        Some(&f) if f.is_finite() && f > 0.0 => f,
        _ => 1.0,
    }
}

/// Shortest physical trip time from `source` to `target` under the
/// two-layer edge-weight model, or `None` when unreachable.
pub fn shortest_time(
    edges: &EdgesView<'_>,
    source: u32,
    target: u32,
    params: &QueryParams,
) -> Result<Option<f64>, EngineError> {
    let num_nodes = edges.num_nodes;
    if source >= num_nodes || target >= num_nodes {
        return Err(EngineError::OutOfRange(format!(
            "source {} / target {} out of range [0, {})",
            source, target, num_nodes
        )));
    }
    if !(params.bike_speed_m_per_s.is_finite() && params.bike_speed_m_per_s > 0.0)
        || !(params.walk_speed_m_per_s.is_finite() && params.walk_speed_m_per_s > 0.0)
    {
        return Err(EngineError::InvalidParam(
            "bike and walk speeds must be finite and > 0".into(),
        ));
    }

    let inv_bike = 1.0 / params.bike_speed_m_per_s;
    let inv_walk = 1.0 / params.walk_speed_m_per_s;

    let n_states = num_nodes as usize * 2;
    let mut dist = vec![f64::INFINITY; n_states];
    let mut closed = vec![false; n_states];

    let s_ride = source as usize * 2 + Layer::Ride as usize;
    let s_walk = source as usize * 2 + Layer::Walk as usize;
    dist[s_ride] = 0.0;
    dist[s_walk] = 0.0;

    let mut open = BinaryHeap::new();
    open.push(HeapEntry { time: 0.0, state: s_ride });
    open.push(HeapEntry { time: 0.0, state: s_walk });

    while let Some(entry) = open.pop() {
        let cur = entry.state;
        if closed[cur] {
            continue;
        }
        closed[cur] = true;

        let u = (cur / 2) as u32;
        if u == target {
            return Ok(Some(dist[cur]));
        }
        let riding = cur % 2 == Layer::Ride as usize;

        let (mode_bit, inv_speed, factors) = if riding {
            (MODE_BIKE, inv_bike, &params.bike_surface_factor)
        } else {
            (MODE_FOOT, inv_walk, &params.walk_surface_factor)
        };

        for edge_idx in edges.row(u) {
            if edges.mode_mask[edge_idx] & mode_bit == 0 {
                continue;
            }
            let v = edges.neighbors[edge_idx];
            let len = edges.lengths_m[edge_idx] as f64;
            let t_edge = len * inv_speed * surface_factor(factors, edges.surface_primary[edge_idx]);

            let next = v as usize * 2 + (cur % 2);
            let tentative = dist[cur] + t_edge;
            if tentative < dist[next] {
                dist[next] = tentative;
                open.push(HeapEntry { time: tentative, state: next });
            }
        }

        let penalty = if riding {
            params.ride_to_walk_penalty_s
        } else {
            params.walk_to_ride_penalty_s
        };
        if penalty >= 0.0 {
            let next = u as usize * 2 + if riding { Layer::Walk } else { Layer::Ride } as usize;
            let tentative = dist[cur] + penalty;
            if tentative < dist[next] {
                dist[next] = tentative;
                open.push(HeapEntry { time: tentative, state: next });
            }
        }
    }

    Ok(None)
}
