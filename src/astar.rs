//! Two-layer time-optimal A* over the mmap'd CSR graph
//!
//! The state space is the node set doubled: one copy for riding, one
//! for walking, encoded `s = 2 * node + layer`. Movement stays inside a
//! layer; zero-length mode-switch arcs cross layers at the same node for
//! a configurable time penalty. Two scalars are tracked per state:
//! `g_time` is physical trip time (edge traversal plus switch
//! penalties), `g_cost` additionally carries the soft bias charged on
//! non-preferred bike surfaces. The search minimises `g_cost + h`; the
//! reported duration is `g_time` at the goal, so the bias steers route
//! choice without inflating the reported time.
//!
//! The heuristic is straight-line time at the faster of the two speeds,
//! which lower-bounds `g_cost` of any completion: every edge charges at
//! least `length / v_max` and switch arcs are non-negative at distance
//! zero.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::EngineError;
use crate::geo::haversine_meters;
use crate::graph::{EdgesView, NodesView};
use crate::surface::{StepLabel, MODE_BIKE, MODE_FOOT};

/// Which copy of the node set a state lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Ride = 0,
    Walk = 1,
}

#[inline]
fn state_of(node: u32, layer: Layer) -> usize {
    node as usize * 2 + layer as usize
}

/// Sentinel in `parent_edge` marking a mode-switch step.
const SWITCH: u32 = u32::MAX;

/// Query parameter record. All per-mode knobs live here, addressed by
/// the layer that uses them.
#[derive(Debug, Clone)]
pub struct QueryParams {
    /// Bit `i` set means surface primary `i` is preferred for riding.
    pub bike_surface_mask: u16,

    /// Speeds in meters per second; must be finite and positive.
    pub bike_speed_m_per_s: f64,
    pub walk_speed_m_per_s: f64,

    /// Mode-switch time penalties in seconds; negative disables the arc.
    pub ride_to_walk_penalty_s: f64,
    pub walk_to_ride_penalty_s: f64,

    /// Per-surface speed multipliers indexed by surface primary. Empty,
    /// out-of-range, non-finite, or non-positive entries fall back to 1.
    pub bike_surface_factor: Vec<f64>,
    pub walk_surface_factor: Vec<f64>,

    /// Soft bias on non-preferred bike surfaces, seconds per kilometer.
    /// Zero disables the bias.
    pub surface_penalty_s_per_km: f64,
}

impl Default for QueryParams {
    fn default() -> Self {
        QueryParams {
            bike_surface_mask: 0xFFFF,
            bike_speed_m_per_s: 6.0, // ~21.6 km/h
            walk_speed_m_per_s: 1.5, // ~5.4 km/h
            ride_to_walk_penalty_s: 5.0,
            walk_to_ride_penalty_s: 3.0,
            bike_surface_factor: Vec::new(),
            walk_surface_factor: Vec::new(),
            surface_penalty_s_per_km: 0.0,
        }
    }
}

/// A finished (or failed) route.
#[derive(Debug, Clone, Default)]
pub struct RouteResult {
    pub success: bool,
    pub nodes: Vec<u32>,
    /// One label per step between consecutive nodes.
    pub labels: Vec<StepLabel>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub distance_foot: f64,
    pub distance_bike_preferred: f64,
    pub distance_bike_non_preferred: f64,
}

struct HeapEntry {
    priority: f64, // f = g_cost + h
    node: u32,
    layer: Layer,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
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
        // Reverse ordering for min-heap behaviour.
        other
            .priority
            .partial_cmp(&self.priority)
            .unwrap_or(Ordering::Equal)
    }
}

/// Factor by surface primary index; 1.0 whenever the table has nothing
/// usable to say.
fn surface_factor(factors: &[f64], surface: u8) -> f64 {
    match factors.get(surface as usize) {
        Some(&f) if f.is_finite() && f > 0.0 => f,
        _ => 1.0,
    }
}

fn is_preferred_bike(surface: u8, mask: u16) -> bool {
    if surface >= 16 {
        return true; // out of taxonomy, neutral
    }
    (mask >> surface) & 1 != 0
}

/// Time-optimal multimodal route between two graph node indices.
pub fn route(
    nodes: &NodesView<'_>,
    edges: &EdgesView<'_>,
    source: u32,
    target: u32,
    params: &QueryParams,
) -> Result<RouteResult, EngineError> {
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
    let v_max = params.bike_speed_m_per_s.max(params.walk_speed_m_per_s);
    let bias_per_m = params.surface_penalty_s_per_km.max(0.0) * 0.001;

    let target_lat = nodes.lat[target as usize] as f64;
    let target_lon = nodes.lon[target as usize] as f64;
    let heuristic = |node: u32| -> f64 {
        haversine_meters(
            nodes.lat[node as usize] as f64,
            nodes.lon[node as usize] as f64,
            target_lat,
            target_lon,
        ) / v_max
    };

    let n_states = num_nodes as usize * 2;
    let mut g_cost = vec![f64::INFINITY; n_states];
    let mut g_time = vec![0.0f64; n_states];
    let mut parent = vec![u32::MAX; n_states];
    let mut parent_edge = vec![u32::MAX; n_states];
    let mut parent_label = vec![0u8; n_states];
    let mut closed = vec![false; n_states];

    let s_ride = state_of(source, Layer::Ride);
    let s_walk = state_of(source, Layer::Walk);
    g_cost[s_ride] = 0.0;
    g_cost[s_walk] = 0.0;

    let mut open = BinaryHeap::new();
    let h_source = heuristic(source);
    open.push(HeapEntry {
        priority: h_source,
        node: source,
        layer: Layer::Ride,
    });
    open.push(HeapEntry {
        priority: h_source,
        node: source,
        layer: Layer::Walk,
    });

    let mut goal_state = usize::MAX;

    while let Some(entry) = open.pop() {
        let u = entry.node;
        let layer = entry.layer;
        let cur = state_of(u, layer);
        if closed[cur] {
            continue; // stale duplicate
        }
        closed[cur] = true;

        if u == target {
            goal_state = cur;
            break;
        }

        match layer {
            Layer::Ride => {
                for edge_idx in edges.row(u) {
                    if edges.mode_mask[edge_idx] & MODE_BIKE == 0 {
                        continue;
                    }
                    let v = edges.neighbors[edge_idx];
                    let len = edges.lengths_m[edge_idx] as f64;
                    let surface = edges.surface_primary[edge_idx];

                    let factor = surface_factor(&params.bike_surface_factor, surface);
                    let t_edge = len * inv_bike * factor;

                    let preferred = is_preferred_bike(surface, params.bike_surface_mask);
                    let bias = if preferred { 0.0 } else { bias_per_m * len };
                    let label = if preferred {
                        StepLabel::BikePreferred
                    } else {
                        StepLabel::BikeNonPreferred
                    };

                    let next = state_of(v, Layer::Ride);
                    let tentative = g_cost[cur] + t_edge + bias;
                    if tentative < g_cost[next] {
                        g_cost[next] = tentative;
                        g_time[next] = g_time[cur] + t_edge;
                        parent[next] = cur as u32;
                        parent_edge[next] = edge_idx as u32;
                        parent_label[next] = label as u8;
                        open.push(HeapEntry {
                            priority: tentative + heuristic(v),
                            node: v,
                            layer: Layer::Ride,
                        });
                    }
                }

                if params.ride_to_walk_penalty_s >= 0.0 {
                    let next = state_of(u, Layer::Walk);
                    let tentative = g_cost[cur] + params.ride_to_walk_penalty_s;
                    if tentative < g_cost[next] {
                        g_cost[next] = tentative;
                        // Dismounting is real time spent at the node.
                        g_time[next] = g_time[cur] + params.ride_to_walk_penalty_s;
                        parent[next] = cur as u32;
                        parent_edge[next] = SWITCH;
                        parent_label[next] = 0;
                        open.push(HeapEntry {
                            priority: tentative + heuristic(u),
                            node: u,
                            layer: Layer::Walk,
                        });
                    }
                }
            }
            Layer::Walk => {
                for edge_idx in edges.row(u) {
                    if edges.mode_mask[edge_idx] & MODE_FOOT == 0 {
                        continue;
                    }
                    let v = edges.neighbors[edge_idx];
                    let len = edges.lengths_m[edge_idx] as f64;
                    let surface = edges.surface_primary[edge_idx];

                    let factor = surface_factor(&params.walk_surface_factor, surface);
                    let t_edge = len * inv_walk * factor;

                    let next = state_of(v, Layer::Walk);
                    let tentative = g_cost[cur] + t_edge;
                    if tentative < g_cost[next] {
                        g_cost[next] = tentative;
                        g_time[next] = g_time[cur] + t_edge;
                        parent[next] = cur as u32;
                        parent_edge[next] = edge_idx as u32;
                        parent_label[next] = StepLabel::Foot as u8;
                        open.push(HeapEntry {
                            priority: tentative + heuristic(v),
                            node: v,
                            layer: Layer::Walk,
                        });
                    }
                }

                if params.walk_to_ride_penalty_s >= 0.0 {
                    let next = state_of(u, Layer::Ride);
                    let tentative = g_cost[cur] + params.walk_to_ride_penalty_s;
                    if tentative < g_cost[next] {
                        g_cost[next] = tentative;
                        // Remounting is real time spent at the node.
                        g_time[next] = g_time[cur] + params.walk_to_ride_penalty_s;
                        parent[next] = cur as u32;
                        parent_edge[next] = SWITCH;
                        parent_label[next] = 0;
                        open.push(HeapEntry {
                            priority: tentative + heuristic(u),
                            node: u,
                            layer: Layer::Ride,
                        });
                    }
                }
            }
        }
    }

    if goal_state == usize::MAX {
        // Exhausted without reaching the target: a result, not an error.
        return Ok(RouteResult::default());
    }

    // Walk the parent chain back to the source.
    let mut chain: Vec<usize> = Vec::new();
    let mut cur = goal_state;
    loop {
        chain.push(cur);
        let p = parent[cur];
        if p == u32::MAX {
            break;
        }
        cur = p as usize;
    }
    chain.reverse();

    let mut result = RouteResult {
        success: true,
        duration_s: g_time[goal_state],
        ..Default::default()
    };
    result.nodes.push((chain[0] / 2) as u32);

    for &state in &chain[1..] {
        let edge_idx = parent_edge[state];
        if edge_idx == SWITCH {
            continue; // same-node layer change, no step emitted
        }
        let len = edges.lengths_m[edge_idx as usize] as f64;
        let label = StepLabel::from_u8(parent_label[state]).expect("label set with parent edge");

        result.distance_m += len;
        match label {
            StepLabel::Foot => result.distance_foot += len,
            StepLabel::BikePreferred => result.distance_bike_preferred += len,
            StepLabel::BikeNonPreferred => result.distance_bike_non_preferred += len,
        }
        result.labels.push(label);
        result.nodes.push((state / 2) as u32);
    }

    Ok(result)
}
