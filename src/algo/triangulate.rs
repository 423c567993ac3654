//! Splitting polygons into triangles via ear clipping.
//!
//! The algorithm is the naive one: in each round, all remaining corners are
//! checked in order and the first one that forms a valid ear is clipped. A
//! check is `O(n)`, so the whole thing is `O(n³)` in the worst case. Polygons
//! in mesh files rarely have more than a handful of corners, so that's fine.

use cgmath::{
    prelude::*,
    Point3, Vector3,
};
use log::warn;


/// Estimates the normal of a (roughly planar) polygon by summing the cross
/// products of all consecutive corner pairs relative to the first corner.
///
/// The result is normalized, unless the sum is the zero vector (e.g. for a
/// polygon with all corners on a line), in which case the zero vector is
/// returned.
pub fn estimate_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let seed = match points.first() {
        Some(p) => *p,
        None => return Vector3::zero(),
    };

    let n = points.windows(2)
        .map(|w| (w[0] - seed).cross(w[1] - seed))
        .fold(Vector3::zero(), |acc, c| acc + c);

    if n.magnitude() > 0.0 {
        n.normalize()
    } else {
        n
    }
}

/// Triangulates the polygon with the given corners (in order).
///
/// Returns triangles as index triples into `points`, with the same
/// orientation as the polygon. For a simple, roughly planar polygon with `n`
/// corners, the `n - 2` triangles cover exactly the polygon. If at some point
/// no valid ear can be found (degenerate or self intersecting polygons), the
/// first remaining corner is clipped anyway, so this function always returns
/// `n - 2` triangles for `n >= 3`.
pub fn ear_clip(points: &[Point3<f64>]) -> Vec<[usize; 3]> {
    let n = points.len();
    match n {
        0..=2 => return vec![],
        3 => return vec![[0, 1, 2]],
        _ => {}
    }

    let mut ring = Ring::new(n);
    let normal = estimate_normal(points);
    let mut triangles = Vec::with_capacity(n - 2);

    while ring.len > 3 {
        let ear = ring.corners().find(|&j| can_clip(points, &ring, j, normal));
        let j = match ear {
            Some(j) => j,
            None => {
                warn!(
                    "no valid ear in polygon with {} remaining corners (degenerate or \
                        non-planar polygon?), clipping first corner anyway",
                    ring.len,
                );
                ring.first()
            }
        };

        triangles.push(ring.clip(j));
    }

    triangles.push(ring.clip(ring.first()));
    triangles
}

/// The corners of the polygon that are not clipped yet, as circular doubly
/// linked list over corner indices.
struct Ring {
    next: Vec<usize>,
    prev: Vec<usize>,
    alive: Vec<bool>,
    len: usize,
}

impl Ring {
    fn new(n: usize) -> Self {
        Self {
            next: (0..n).map(|i| (i + 1) % n).collect(),
            prev: (0..n).map(|i| (i + n - 1) % n).collect(),
            alive: vec![true; n],
            len: n,
        }
    }

    /// Remaining corners in their original order.
    fn corners(&self) -> impl Iterator<Item = usize> + '_ {
        self.alive.iter().enumerate().filter(|(_, &a)| a).map(|(i, _)| i)
    }

    fn first(&self) -> usize {
        // The ring is never empty when this is called.
        self.corners().next().unwrap_or(0)
    }

    /// Removes corner `j` and returns the triangle `(prev, j, next)`.
    fn clip(&mut self, j: usize) -> [usize; 3] {
        let (i, k) = (self.prev[j], self.next[j]);
        self.next[i] = k;
        self.prev[k] = i;
        self.alive[j] = false;
        self.len -= 1;

        [i, j, k]
    }
}

/// Checks whether the triangle `(prev, j, next)` is a valid ear: it has to be
/// non-degenerate, oriented like the whole polygon, and no other remaining
/// edge may cross it or have a corner inside it.
fn can_clip(points: &[Point3<f64>], ring: &Ring, j: usize, normal: Vector3<f64>) -> bool {
    let i = ring.prev[j];
    let k = ring.next[j];
    let (pi, pj, pk) = (points[i], points[j], points[k]);

    let nj = (pk - pj).cross(pi - pj);
    if nj.magnitude() <= 0.0 || nj.dot(normal) <= 0.0 {
        return false;
    }

    // Whether `p` lies strictly inside the candidate triangle.
    let inside = |p: Point3<f64>| {
        (pk - p).cross(pi - p).dot(nj) > 0.0
            && (pi - p).cross(pj - p).dot(nj) > 0.0
            && (pj - p).cross(pk - p).dot(nj) > 0.0
    };

    // Walk all edges `(l, m)` of the remaining polygon except the two edges
    // of the ear itself.
    let mut l = ring.next[k];
    while l != i {
        let m = ring.next[l];
        let (pl, pm) = (points[l], points[m]);

        if pl == pk {
            // The edge starts at a duplicate of `k`.
            if inside(pm) {
                return false;
            }
        } else if pm == pi {
            // The edge ends at `i`.
            if inside(pl) {
                return false;
            }
        } else {
            // Does edge `(l, m)` cross the diagonal `(k, i)`?
            let nl = (pk - pl).cross(pi - pl);
            let nm = (pk - pm).cross(pi - pm);
            let ni = (pl - pi).cross(pm - pi);
            let nk = (pl - pk).cross(pm - pk);
            if nm.dot(nl) < 0.0 && ni.dot(nk) < 0.0 {
                return false;
            }
        }

        l = m;
    }

    true
}


#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use fxhash::FxHashMap;

    use super::*;

    fn polygon_2d(coords: &[[f64; 2]]) -> Vec<Point3<f64>> {
        coords.iter().map(|c| Point3::new(c[0], c[1], 0.0)).collect()
    }

    fn triangle_area(points: &[Point3<f64>], t: [usize; 3]) -> f64 {
        let [a, b, c] = t;
        0.5 * (points[b] - points[a]).cross(points[c] - points[a]).magnitude()
    }

    /// Area of a planar polygon via the Newell sum.
    fn polygon_area(points: &[Point3<f64>]) -> f64 {
        let seed = points[0];
        points.windows(2)
            .map(|w| (w[0] - seed).cross(w[1] - seed))
            .fold(Vector3::zero(), |acc, c| acc + c)
            .magnitude() * 0.5
    }

    /// Checks that every polygon edge is used by exactly one triangle and
    /// every other triangle edge (a diagonal) by exactly two.
    fn assert_edges_partitioned(n: usize, triangles: &[[usize; 3]]) {
        let mut counts = FxHashMap::default();
        for t in triangles {
            for e in 0..3 {
                let (a, b) = (t[e], t[(e + 1) % 3]);
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }

        for i in 0..n {
            let (a, b) = (i, (i + 1) % n);
            assert_eq!(counts.get(&(a.min(b), a.max(b))), Some(&1), "edge {}-{}", a, b);
        }
        for (&(a, b), &count) in &counts {
            let boundary = b - a == 1 || (a == 0 && b == n - 1);
            if !boundary {
                assert_eq!(count, 2, "diagonal {}-{}", a, b);
            }
        }
    }

    #[test]
    fn too_few_corners() {
        assert!(ear_clip(&[]).is_empty());
        assert!(ear_clip(&polygon_2d(&[[0.0, 0.0], [1.0, 0.0]])).is_empty());
        assert_eq!(ear_clip(&polygon_2d(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]])), vec![[0, 1, 2]]);
    }

    #[test]
    fn square() {
        let points = polygon_2d(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        assert_eq!(estimate_normal(&points), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(ear_clip(&points), vec![[3, 0, 1], [3, 1, 2]]);
    }

    #[test]
    fn regular_polygons() {
        for &n in &[4, 5, 6, 7, 8, 12, 31] {
            // A tilted, but planar, regular polygon
            let points = (0..n)
                .map(|i| {
                    let angle = 2.0 * PI * (i as f64) / (n as f64);
                    Point3::new(angle.cos(), angle.sin(), 0.5 * angle.cos() + 2.0)
                })
                .collect::<Vec<_>>();

            let triangles = ear_clip(&points);
            assert_eq!(triangles.len(), n - 2);

            let area: f64 = triangles.iter().map(|&t| triangle_area(&points, t)).sum();
            assert!((area - polygon_area(&points)).abs() < 1e-9, "n = {}", n);
            assert_edges_partitioned(n, &triangles);
        }
    }

    #[test]
    fn concave() {
        // Square with a notch cut into the top edge
        let points = polygon_2d(&[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [2.0, 1.0], [0.0, 4.0]]);

        let triangles = ear_clip(&points);
        assert_eq!(triangles, vec![[1, 2, 3], [0, 1, 3], [4, 0, 3]]);

        let area: f64 = triangles.iter().map(|&t| triangle_area(&points, t)).sum();
        assert!((area - 10.0).abs() < 1e-9);

        // All triangles keep the orientation of the polygon.
        for &[a, b, c] in &triangles {
            let n = (points[b] - points[a]).cross(points[c] - points[a]);
            assert!(n.z > 0.0);
        }
    }

    #[test]
    fn clockwise() {
        let points = polygon_2d(&[[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]);
        assert_eq!(estimate_normal(&points), Vector3::new(0.0, 0.0, -1.0));

        let triangles = ear_clip(&points);
        assert_eq!(triangles.len(), 2);
        for &[a, b, c] in &triangles {
            let n = (points[b] - points[a]).cross(points[c] - points[a]);
            assert!(n.z < 0.0);
        }
    }

    #[test]
    fn degenerate_forces_clip() {
        crate::test_utils::init_logger();

        let points = polygon_2d(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]);
        assert_eq!(estimate_normal(&points), Vector3::zero());
        assert_eq!(ear_clip(&points), vec![[3, 0, 1], [3, 1, 2]]);
    }
}
