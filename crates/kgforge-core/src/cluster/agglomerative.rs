//! Average-linkage agglomerative clustering over a distance matrix.

use super::{ClusterBackend, ClusterError};

/// Merges the closest pair of clusters while their average distance is
/// below `distance_threshold`. Every point receives a label.
#[derive(Debug, Clone)]
pub struct Agglomerative {
    distance_threshold: f64,
}

impl Agglomerative {
    pub fn new(distance_threshold: f64) -> Self {
        Self { distance_threshold }
    }
}

impl ClusterBackend for Agglomerative {
    fn name(&self) -> &'static str {
        "agglomerative"
    }

    fn fit_predict(&self, distances: &[Vec<f64>]) -> Result<Vec<Option<usize>>, ClusterError> {
        if !self.distance_threshold.is_finite() || self.distance_threshold < 0.0 {
            return Err(ClusterError::InvalidParameter(format!(
                "distance_threshold must be finite and non-negative, got {}",
                self.distance_threshold
            )));
        }
        let n = distances.len();
        if n == 0 {
            return Err(ClusterError::EmptyInput);
        }

        // Working copy updated with the Lance-Williams formula for average linkage.
        let mut dist: Vec<Vec<f64>> = distances.to_vec();
        let mut size = vec![1usize; n];
        let mut active = vec![true; n];
        // Cluster slot each point currently belongs to.
        let mut slot: Vec<usize> = (0..n).collect();

        loop {
            let mut best: Option<(usize, usize, f64)> = None;
            for i in (0..n).filter(|&i| active[i]) {
                for j in (i + 1..n).filter(|&j| active[j]) {
                    let d = dist[i][j];
                    if best.map_or(true, |(_, _, b)| d < b) {
                        best = Some((i, j, d));
                    }
                }
            }

            let Some((i, j, d)) = best else { break };
            if d >= self.distance_threshold {
                break;
            }

            // Merge j into i
            let (ni, nj) = (size[i] as f64, size[j] as f64);
            for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
                let merged = (ni * dist[i][k] + nj * dist[j][k]) / (ni + nj);
                dist[i][k] = merged;
                dist[k][i] = merged;
            }
            size[i] += size[j];
            active[j] = false;
            for s in slot.iter_mut().filter(|s| **s == j) {
                *s = i;
            }
        }

        // Relabel slots in first-occurrence order
        let mut labels = Vec::with_capacity(n);
        let mut seen: Vec<usize> = Vec::new();
        for s in slot {
            let label = match seen.iter().position(|&x| x == s) {
                Some(label) => label,
                None => {
                    seen.push(s);
                    seen.len() - 1
                }
            };
            labels.push(Some(label));
        }

        Ok(labels)
    }
}
