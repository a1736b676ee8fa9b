//! Density-based clustering over face embeddings.
//!
//! DBSCAN-style algorithm parameterized like HDBSCAN (`min_samples`,
//! `min_cluster_size`). Embeddings are L2-normalized before clustering so
//! the Euclidean metric behaves like cosine similarity; on unit vectors
//! `d = sqrt(2 - 2*cos)`. Points that end up in no sufficiently dense or
//! large cluster get the noise label `-1`.
//!
//! Output is deterministic for a fixed input order: points are visited in
//! index order and cluster ids are assigned in discovery order. Membership
//! is therefore reproducible run-to-run for an identical corpus.

/// Label assigned to points that belong to no cluster.
pub const NOISE: i64 = -1;

#[derive(Debug, Clone, Copy)]
pub struct ClusterParams {
    /// Neighbors (excluding the point itself) required within `epsilon`
    /// for a point to be a core point.
    pub min_samples: usize,
    /// Clusters smaller than this are dissolved into noise.
    pub min_cluster_size: usize,
    /// Euclidean neighborhood radius on normalized vectors.
    pub epsilon: f32,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            min_samples: 2,
            min_cluster_size: 4,
            epsilon: 1.0,
        }
    }
}

/// Cluster `embeddings`, returning one label per input (cluster id or
/// [`NOISE`]). Inputs are normalized internally; the caller's vectors are
/// untouched.
pub fn cluster_embeddings(embeddings: &[Vec<f32>], params: &ClusterParams) -> Vec<i64> {
    let mut labels = vec![NOISE; embeddings.len()];
    if embeddings.is_empty() {
        return labels;
    }

    let normalized: Vec<Vec<f32>> = embeddings.iter().map(|e| l2_normalize(e)).collect();

    let mut visited = vec![false; normalized.len()];
    let mut next_cluster: i64 = 0;

    for i in 0..normalized.len() {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let mut neighbors = find_neighbors(&normalized, i, params.epsilon);
        if neighbors.len() < params.min_samples {
            continue;
        }

        // Expand the cluster from this core point.
        let mut members = vec![i];
        let mut j = 0;
        while j < neighbors.len() {
            let neighbor = neighbors[j];
            if !visited[neighbor] {
                visited[neighbor] = true;
                let neighbor_neighbors = find_neighbors(&normalized, neighbor, params.epsilon);
                if neighbor_neighbors.len() >= params.min_samples {
                    neighbors.extend(neighbor_neighbors);
                }
            }
            if !members.contains(&neighbor) {
                members.push(neighbor);
            }
            j += 1;
        }

        if members.len() < params.min_cluster_size {
            continue;
        }

        for member in members {
            labels[member] = next_cluster;
        }
        next_cluster += 1;
    }

    labels
}

fn find_neighbors(embeddings: &[Vec<f32>], index: usize, epsilon: f32) -> Vec<usize> {
    let point = &embeddings[index];
    let mut neighbors = Vec::new();
    for (i, other) in embeddings.iter().enumerate() {
        if i == index {
            continue;
        }
        if euclidean_distance(point, other) <= epsilon {
            neighbors.push(i);
        }
    }
    neighbors
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Normalize to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Mean of a set of equal-length vectors.
pub fn mean_embedding(vectors: &[&[f32]]) -> Vec<f32> {
    if vectors.is_empty() {
        return Vec::new();
    }
    let dim = vectors[0].len();
    let mut mean = vec![0.0f32; dim];
    for vector in vectors {
        for (slot, value) in mean.iter_mut().zip(vector.iter()) {
            *slot += value;
        }
    }
    let count = vectors.len() as f32;
    for slot in &mut mean {
        *slot /= count;
    }
    mean
}

/// Index of the vector in `candidates` most similar to `target` by cosine
/// similarity. Returns None for an empty candidate list.
pub fn index_of_closest(target: &[f32], candidates: &[Vec<f32>]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let similarity = cosine_similarity(target, candidate);
        if best.map(|(_, s)| similarity > s).unwrap_or(true) {
            best = Some((i, similarity));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jitter(base: &[f32], delta: f32) -> Vec<f32> {
        let mut v = base.to_vec();
        v[0] += delta;
        v
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.0001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 0.0001);
        assert!((v[1] - 0.8).abs() < 0.0001);

        let zero = l2_normalize(&[0.0, 0.0]);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_mean_embedding() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        let mean = mean_embedding(&[a.as_slice(), b.as_slice()]);
        assert_eq!(mean, vec![0.5, 0.5]);
    }

    #[test]
    fn test_empty_input() {
        let labels = cluster_embeddings(&[], &ClusterParams::default());
        assert!(labels.is_empty());
    }

    #[test]
    fn test_three_similar_one_outlier() {
        let base = vec![1.0, 0.0, 0.0, 0.0];
        let embeddings = vec![
            jitter(&base, 0.01),
            jitter(&base, 0.02),
            jitter(&base, 0.03),
            vec![0.0, 1.0, 0.0, 0.0], // orthogonal outlier
        ];
        let params = ClusterParams {
            min_samples: 1,
            min_cluster_size: 2,
            epsilon: 1.0,
        };
        let labels = cluster_embeddings(&embeddings, &params);

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_ne!(labels[0], NOISE);
        assert_eq!(labels[3], NOISE);
    }

    #[test]
    fn test_outlier_is_noise() {
        let base = vec![0.5, 0.5, 0.0];
        let mut embeddings: Vec<Vec<f32>> = (0..6).map(|i| jitter(&base, i as f32 * 0.001)).collect();
        embeddings.push(vec![0.0, 0.0, 1.0]);

        let labels = cluster_embeddings(&embeddings, &ClusterParams::default());
        assert_eq!(labels[6], NOISE);
        assert!(labels[..6].iter().all(|&l| l == labels[0] && l != NOISE));
    }

    #[test]
    fn test_deterministic_membership() {
        let embeddings: Vec<Vec<f32>> = (0..20)
            .map(|i| {
                let group = i % 2;
                vec![
                    if group == 0 { 1.0 } else { 0.0 } + (i as f32) * 0.001,
                    if group == 0 { 0.0 } else { 1.0 },
                    0.0,
                ]
            })
            .collect();

        let params = ClusterParams::default();
        let first = cluster_embeddings(&embeddings, &params);
        let second = cluster_embeddings(&embeddings, &params);
        assert_eq!(first, second);
    }

    #[test]
    fn test_min_cluster_size_dissolves_small_clusters() {
        let base = vec![1.0, 0.0];
        let embeddings = vec![jitter(&base, 0.001), jitter(&base, 0.002), jitter(&base, 0.003)];
        let params = ClusterParams {
            min_samples: 1,
            min_cluster_size: 4,
            epsilon: 1.0,
        };
        let labels = cluster_embeddings(&embeddings, &params);
        assert!(labels.iter().all(|&l| l == NOISE));
    }
}
