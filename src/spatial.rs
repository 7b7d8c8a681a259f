//! Packed KD-tree for snapping a coordinate to the nearest graph node
//!
//! Built once over all node coordinates and immutable afterwards. Nodes
//! live in a single backing vec in post-order of the recursive
//! median partition; each records its point index, split axis, and
//! child slots. Queries are a best-first descent with squared-distance
//! pruning under the local equirectangular metric, so "nearest" is
//! nearest in that approximation, which is what snapping needs.

use crate::error::EngineError;
use crate::geo::equirect_d2;
use crate::graph::NodesView;

const NO_CHILD: u32 = u32::MAX;

struct KdNode {
    point: u32,
    left: u32,
    right: u32,
    axis: u8, // 0 = lat, 1 = lon
}

pub struct KdTree {
    nodes: Vec<KdNode>,
    root: u32,
    lat: Vec<f32>,
    lon: Vec<f32>,
}

impl KdTree {
    /// Build the index over every node in the view.
    pub fn build(nodes: &NodesView<'_>) -> KdTree {
        let lat: Vec<f32> = nodes.lat.to_vec();
        let lon: Vec<f32> = nodes.lon.to_vec();

        let mut order: Vec<u32> = (0..nodes.num_nodes).collect();
        let mut packed = Vec::with_capacity(order.len());
        let root = build_rec(&mut order, 0, &lat, &lon, &mut packed);

        KdTree {
            nodes: packed,
            root,
            lat,
            lon,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nearest graph node to (lat, lon) in degrees. Ties break toward
    /// the smaller point index.
    pub fn nearest(&self, lat: f64, lon: f64) -> Result<u32, EngineError> {
        if self.is_empty() {
            return Err(EngineError::NotLoaded);
        }
        let cos_lat = lat.to_radians().cos();
        let mut best = (f64::INFINITY, u32::MAX);
        self.descend(self.root, lat, lon, cos_lat, &mut best);
        Ok(best.1)
    }

    /// Coordinates of a graph node by index.
    pub fn get_node(&self, index: u32) -> Result<(f32, f32), EngineError> {
        if index as usize >= self.lat.len() {
            return Err(EngineError::OutOfRange(format!(
                "node index {} >= num_nodes {}",
                index,
                self.lat.len()
            )));
        }
        Ok((self.lat[index as usize], self.lon[index as usize]))
    }

    fn descend(&self, slot: u32, qlat: f64, qlon: f64, cos_lat: f64, best: &mut (f64, u32)) {
        let node = &self.nodes[slot as usize];
        let plat = self.lat[node.point as usize] as f64;
        let plon = self.lon[node.point as usize] as f64;

        let d2 = equirect_d2(qlat, qlon, plat, plon, cos_lat);
        if d2 < best.0 || (d2 == best.0 && node.point < best.1) {
            *best = (d2, node.point);
        }

        // Signed distance to the splitting plane, in the same scaled
        // degree units as the metric.
        let plane = if node.axis == 0 {
            qlat - plat
        } else {
            (qlon - plon) * cos_lat
        };

        let (near, far) = if plane < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if near != NO_CHILD {
            self.descend(near, qlat, qlon, cos_lat, best);
        }
        // <= keeps equidistant far-side points reachable for the
        // smaller-index tie-break.
        if far != NO_CHILD && plane * plane <= best.0 {
            self.descend(far, qlat, qlon, cos_lat, best);
        }
    }
}

fn build_rec(order: &mut [u32], depth: usize, lat: &[f32], lon: &[f32], out: &mut Vec<KdNode>) -> u32 {
    if order.is_empty() {
        return NO_CHILD;
    }
    let axis = (depth % 2) as u8;
    let key = |i: u32| -> f32 {
        if axis == 0 {
            lat[i as usize]
        } else {
            lon[i as usize]
        }
    };

    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        key(a)
            .partial_cmp(&key(b))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let (lo, rest) = order.split_at_mut(mid);
    let (&mut point, hi) = rest.split_first_mut().expect("rest is non-empty");

    let left = build_rec(lo, depth + 1, lat, lon, out);
    let right = build_rec(hi, depth + 1, lat, lon, out);

    out.push(KdNode {
        point,
        left,
        right,
        axis,
    });
    (out.len() - 1) as u32
}
