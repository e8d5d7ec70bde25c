//! Hierarchical agglomerative clustering with a distance cutoff.
//!
//! The dendrogram is built with the nearest-neighbour chain algorithm over a
//! condensed distance matrix, updating linkage distances with the
//! Lance-Williams recurrences. All supported linkages are reducible, so every
//! merge below the cutoff only ever combines clusters that were themselves
//! formed below the cutoff. Cutting the tree is therefore a union of all
//! merges whose distance is strictly below the threshold.

use serde::{Deserialize, Serialize};

/// Inter-cluster distance definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Minimum variance increase
    #[default]
    Ward,
    Average,
    Complete,
    Single,
}

/// One step of the dendrogram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// Representative point of the first cluster
    pub left: usize,
    /// Representative point of the second cluster
    pub right: usize,
    pub distance: f64,
    /// Number of points in the merged cluster
    pub size: usize,
}

/// Upper-triangular pairwise distances
struct CondensedMatrix {
    n: usize,
    data: Vec<f64>,
}

impl CondensedMatrix {
    fn from_points(points: &[Vec<f32>]) -> Self {
        let n = points.len();
        let mut data = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                data.push(euclidean(&points[i], &points[j]));
            }
        }
        Self { n, data }
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.n * i - i * (i + 1) / 2 + (j - i - 1)
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.index(i, j)]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize, value: f64) {
        let index = self.index(i, j);
        self.data[index] = value;
    }
}

#[inline]
fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

impl Linkage {
    /// Distance from cluster `k` to the union of `a` and `b`
    #[inline]
    fn update(&self, d_ak: f64, d_bk: f64, d_ab: f64, size_a: usize, size_b: usize, size_k: usize) -> f64 {
        match self {
            Linkage::Single => d_ak.min(d_bk),
            Linkage::Complete => d_ak.max(d_bk),
            Linkage::Average => {
                (size_a as f64 * d_ak + size_b as f64 * d_bk) / (size_a + size_b) as f64
            }
            Linkage::Ward => {
                let (a, b, k) = (size_a as f64, size_b as f64, size_k as f64);
                let total = a + b + k;
                let squared = ((a + k) * d_ak * d_ak + (b + k) * d_bk * d_bk - k * d_ab * d_ab) / total;
                squared.max(0.0).sqrt()
            }
        }
    }
}

/// Build the full dendrogram: `points.len() - 1` merges
pub fn linkage_merges(points: &[Vec<f32>], linkage: Linkage) -> Vec<Merge> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }

    let mut distances = CondensedMatrix::from_points(points);
    let mut sizes = vec![1usize; n];
    let mut active = vec![true; n];
    let mut merges = Vec::with_capacity(n - 1);
    let mut chain: Vec<usize> = Vec::with_capacity(n);

    while merges.len() < n - 1 {
        if chain.is_empty() {
            match active.iter().position(|&alive| alive) {
                Some(start) => chain.push(start),
                None => break,
            }
        }

        // Grow the chain until its last two links are reciprocal nearest neighbours
        let (a, b) = loop {
            let tip = chain[chain.len() - 1];
            let previous = chain.len().checked_sub(2).map(|i| chain[i]);

            let mut nearest = previous;
            let mut nearest_distance = previous.map_or(f64::INFINITY, |p| distances.get(tip, p));
            for candidate in 0..n {
                if candidate == tip || !active[candidate] {
                    continue;
                }
                let d = distances.get(tip, candidate);
                if d < nearest_distance {
                    nearest_distance = d;
                    nearest = Some(candidate);
                }
            }

            match nearest {
                Some(next) if Some(next) == previous => break (tip, next),
                Some(next) => chain.push(next),
                None => break (tip, tip),
            }
        };
        if a == b {
            break;
        }
        chain.truncate(chain.len() - 2);

        let d_ab = distances.get(a, b);
        let (keep, absorbed) = if a < b { (a, b) } else { (b, a) };
        let (size_a, size_b) = (sizes[a], sizes[b]);

        for k in 0..n {
            if !active[k] || k == a || k == b {
                continue;
            }
            let updated = linkage.update(
                distances.get(a, k),
                distances.get(b, k),
                d_ab,
                size_a,
                size_b,
                sizes[k],
            );
            distances.set(keep, k, updated);
        }

        active[absorbed] = false;
        sizes[keep] = size_a + size_b;
        merges.push(Merge {
            left: a,
            right: b,
            distance: d_ab,
            size: size_a + size_b,
        });
    }

    merges
}

/// Disjoint-set forest with path halving
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            self.parent[root_b] = root_a;
        }
    }
}

/// Flat cluster labels for `points`, cutting the dendrogram at `threshold`
///
/// Labels start at 0 and are assigned in order of first appearance.
pub fn cluster_labels(points: &[Vec<f32>], threshold: f64, linkage: Linkage) -> Vec<usize> {
    let n = points.len();
    let mut forest = UnionFind::new(n);

    for merge in linkage_merges(points, linkage) {
        if merge.distance < threshold {
            forest.union(merge.left, merge.right);
        }
    }

    let mut label_of_root = vec![usize::MAX; n];
    let mut next_label = 0;
    (0..n)
        .map(|point| {
            let root = forest.find(point);
            if label_of_root[root] == usize::MAX {
                label_of_root[root] = next_label;
                next_label += 1;
            }
            label_of_root[root]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(coords: &[(f32, f32)]) -> Vec<Vec<f32>> {
        coords.iter().map(|&(x, y)| vec![x, y]).collect()
    }

    #[test]
    fn test_empty_and_single() {
        assert!(cluster_labels(&[], 0.3, Linkage::Ward).is_empty());
        assert_eq!(cluster_labels(&points(&[(1.0, 1.0)]), 0.3, Linkage::Ward), vec![0]);
    }

    #[test]
    fn test_two_groups_split_by_threshold() {
        let data = points(&[(0.0, 0.0), (5.0, 5.0), (0.1, 0.0), (5.0, 5.1), (0.0, 0.1)]);

        for linkage in [Linkage::Ward, Linkage::Average, Linkage::Complete, Linkage::Single] {
            let labels = cluster_labels(&data, 1.0, linkage);
            assert_eq!(labels, vec![0, 1, 0, 1, 0], "linkage {:?}", linkage);
        }
    }

    #[test]
    fn test_threshold_controls_granularity() {
        let data = points(&[(0.0, 0.0), (0.2, 0.0), (10.0, 0.0)]);

        assert_eq!(cluster_labels(&data, 0.1, Linkage::Ward), vec![0, 1, 2]);
        assert_eq!(cluster_labels(&data, 0.3, Linkage::Ward), vec![0, 0, 1]);
        assert_eq!(cluster_labels(&data, 100.0, Linkage::Ward), vec![0, 0, 0]);
    }

    #[test]
    fn test_merge_at_threshold_is_not_applied() {
        let data = points(&[(0.0, 0.0), (0.5, 0.0)]);

        assert_eq!(cluster_labels(&data, 0.5, Linkage::Single), vec![0, 1]);
        assert_eq!(cluster_labels(&data, 0.5001, Linkage::Single), vec![0, 0]);
    }

    #[test]
    fn test_identical_points_always_merge() {
        let data = points(&[(0.3, 0.4), (0.3, 0.4), (0.3, 0.4)]);

        assert_eq!(cluster_labels(&data, 1e-9, Linkage::Ward), vec![0, 0, 0]);
    }

    #[test]
    fn test_ward_merge_heights() {
        // Singletons merge at their Euclidean distance
        let data = points(&[(0.0, 0.0), (1.0, 0.0), (4.0, 0.0)]);
        let merges = linkage_merges(&data, Linkage::Ward);

        assert_eq!(merges.len(), 2);
        assert!((merges[0].distance - 1.0).abs() < 1e-9);
        assert_eq!(merges[0].size, 2);
        // Ward distance of {0,1} to {4}: sqrt(2 * 1 * 2 / 3) * 3.5
        let expected = (2.0f64 * 1.0 / 3.0 * 2.0).sqrt() * 3.5;
        assert!((merges[1].distance - expected).abs() < 1e-9, "got {}", merges[1].distance);
        assert_eq!(merges[1].size, 3);
    }

    #[test]
    fn test_single_linkage_chains() {
        let data = points(&[(0.0, 0.0), (0.75, 0.0), (1.75, 0.0), (2.5, 0.0)]);

        assert_eq!(cluster_labels(&data, 1.05, Linkage::Single), vec![0, 0, 0, 0]);
        assert_eq!(cluster_labels(&data, 1.05, Linkage::Complete), vec![0, 0, 1, 1]);
    }
}
