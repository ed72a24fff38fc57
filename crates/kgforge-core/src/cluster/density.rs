//! HDBSCAN over a precomputed distance matrix.
//!
//! Steps: core distances, mutual reachability graph, minimum spanning tree
//! (Prim), single-linkage hierarchy, condensed tree, then excess-of-mass
//! cluster selection. The root of the condensed tree is never selected, so
//! points that only belong to the root are labelled noise.

use std::collections::{HashMap, VecDeque};

use super::{ClusterBackend, ClusterError};

/// Smallest distance used when converting distances to densities.
const MIN_DISTANCE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct Hdbscan {
    min_cluster_size: usize,
    min_samples: usize,
}

impl Hdbscan {
    pub fn new(min_cluster_size: usize, min_samples: usize) -> Self {
        Self {
            min_cluster_size,
            min_samples,
        }
    }
}

/// One merge of the single-linkage hierarchy. Node ids below `n` are points.
#[derive(Debug, Clone, Copy)]
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

/// Edge of the condensed tree: `child` (a point or a cluster) leaves
/// `parent` at density `lambda`.
#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    size: usize,
}

impl ClusterBackend for Hdbscan {
    fn name(&self) -> &'static str {
        "hdbscan"
    }

    fn fit_predict(&self, distances: &[Vec<f64>]) -> Result<Vec<Option<usize>>, ClusterError> {
        let n = distances.len();
        if n == 0 {
            return Err(ClusterError::EmptyInput);
        }
        if self.min_cluster_size < 2 {
            return Err(ClusterError::InvalidParameter(format!(
                "min_cluster_size must be at least 2, got {}",
                self.min_cluster_size
            )));
        }
        if self.min_samples == 0 || self.min_samples >= n {
            return Err(ClusterError::InvalidParameter(format!(
                "min_samples must be in 1..{}, got {}",
                n, self.min_samples
            )));
        }

        let reachability = mutual_reachability(distances, self.min_samples);
        let mst = prim_mst(&reachability);
        let hierarchy = single_linkage(n, mst);
        let condensed = condense(&hierarchy, n, self.min_cluster_size);
        let selected = select_clusters(&condensed, n);

        Ok(assign_labels(&condensed, &selected, n))
    }
}

fn mutual_reachability(distances: &[Vec<f64>], min_samples: usize) -> Vec<Vec<f64>> {
    let core: Vec<f64> = distances
        .iter()
        .map(|row| {
            let mut sorted = row.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            sorted[min_samples]
        })
        .collect();

    distances
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, &d)| d.max(core[i]).max(core[j]))
                .collect()
        })
        .collect()
}

/// Minimum spanning tree edges `(a, b, weight)` of a dense graph.
fn prim_mst(weights: &[Vec<f64>]) -> Vec<(usize, usize, f64)> {
    let n = weights.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut from = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[0] = true;
    for _ in 1..n {
        for j in 0..n {
            if !in_tree[j] && weights[current][j] < best[j] {
                best[j] = weights[current][j];
                from[j] = current;
            }
        }

        let mut next = None;
        for j in (0..n).filter(|&j| !in_tree[j]) {
            if next.map_or(true, |k: usize| best[j] < best[k]) {
                next = Some(j);
            }
        }
        let Some(next) = next else { break };

        edges.push((from[next], next, best[next]));
        in_tree[next] = true;
        current = next;
    }

    edges
}

/// Build the single-linkage hierarchy from MST edges with union-find.
fn single_linkage(n: usize, mut edges: Vec<(usize, usize, f64)>) -> Vec<Merge> {
    edges.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut parent: Vec<usize> = (0..2 * n).collect();
    let mut size: Vec<usize> = vec![1; 2 * n];
    let mut next_node = n;
    let mut merges = Vec::with_capacity(edges.len());

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for (a, b, distance) in edges {
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        let merged_size = size[ra] + size[rb];

        merges.push(Merge {
            left: ra,
            right: rb,
            distance,
            size: merged_size,
        });

        parent[ra] = next_node;
        parent[rb] = next_node;
        size[next_node] = merged_size;
        next_node += 1;
    }

    merges
}

fn node_size(hierarchy: &[Merge], n: usize, node: usize) -> usize {
    if node < n {
        1
    } else {
        hierarchy[node - n].size
    }
}

/// Points under a hierarchy node.
fn leaves(hierarchy: &[Merge], n: usize, node: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(x) = stack.pop() {
        if x < n {
            out.push(x);
        } else {
            let merge = hierarchy[x - n];
            stack.push(merge.left);
            stack.push(merge.right);
        }
    }
    out
}

/// Collapse the hierarchy so that only splits into two children of at
/// least `min_cluster_size` points create new clusters.
fn condense(hierarchy: &[Merge], n: usize, min_cluster_size: usize) -> Vec<CondensedEdge> {
    let mut edges = Vec::new();
    if hierarchy.is_empty() {
        return edges;
    }

    let root = n + hierarchy.len() - 1;
    let mut relabel: HashMap<usize, usize> = HashMap::new();
    relabel.insert(root, n);
    let mut next_label = n + 1;

    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        if node < n {
            continue;
        }
        let Some(&label) = relabel.get(&node) else {
            continue;
        };

        let merge = hierarchy[node - n];
        let lambda = 1.0 / merge.distance.max(MIN_DISTANCE);
        let left_size = node_size(hierarchy, n, merge.left);
        let right_size = node_size(hierarchy, n, merge.right);

        match (left_size >= min_cluster_size, right_size >= min_cluster_size) {
            (true, true) => {
                for (child, size) in [(merge.left, left_size), (merge.right, right_size)] {
                    relabel.insert(child, next_label);
                    edges.push(CondensedEdge {
                        parent: label,
                        child: next_label,
                        lambda,
                        size,
                    });
                    next_label += 1;
                    queue.push_back(child);
                }
            }
            (false, false) => {
                for child in [merge.left, merge.right] {
                    for point in leaves(hierarchy, n, child) {
                        edges.push(CondensedEdge {
                            parent: label,
                            child: point,
                            lambda,
                            size: 1,
                        });
                    }
                }
            }
            (left_big, _) => {
                let (big, small) = if left_big {
                    (merge.left, merge.right)
                } else {
                    (merge.right, merge.left)
                };
                for point in leaves(hierarchy, n, small) {
                    edges.push(CondensedEdge {
                        parent: label,
                        child: point,
                        lambda,
                        size: 1,
                    });
                }
                relabel.insert(big, label);
                queue.push_back(big);
            }
        }
    }

    edges
}

/// Excess-of-mass selection. Returns the selected cluster labels, sorted.
fn select_clusters(condensed: &[CondensedEdge], n: usize) -> Vec<usize> {
    let cluster_edges: Vec<&CondensedEdge> = condensed.iter().filter(|e| e.child >= n).collect();

    let mut birth: HashMap<usize, f64> = HashMap::new();
    birth.insert(n, 0.0);
    for edge in &cluster_edges {
        birth.insert(edge.child, edge.lambda);
    }

    let mut stability: HashMap<usize, f64> = birth.keys().map(|&c| (c, 0.0)).collect();
    for edge in condensed {
        let born = birth.get(&edge.parent).copied().unwrap_or(0.0);
        if let Some(s) = stability.get_mut(&edge.parent) {
            *s += (edge.lambda - born) * edge.size as f64;
        }
    }

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    for edge in &cluster_edges {
        children.entry(edge.parent).or_default().push(edge.child);
    }

    let mut clusters: Vec<usize> = stability.keys().copied().filter(|&c| c != n).collect();
    clusters.sort_unstable_by(|a, b| b.cmp(a));

    let mut selected: HashMap<usize, bool> = clusters.iter().map(|&c| (c, true)).collect();
    for &cluster in &clusters {
        let child_stability: f64 = children
            .get(&cluster)
            .map(|cs| cs.iter().filter_map(|c| stability.get(c)).sum())
            .unwrap_or(0.0);
        let own = stability.get(&cluster).copied().unwrap_or(0.0);

        if child_stability > own {
            selected.insert(cluster, false);
            stability.insert(cluster, child_stability);
        } else {
            let mut stack = children.get(&cluster).cloned().unwrap_or_default();
            while let Some(descendant) = stack.pop() {
                selected.insert(descendant, false);
                if let Some(grandchildren) = children.get(&descendant) {
                    stack.extend(grandchildren.iter().copied());
                }
            }
        }
    }

    let mut chosen: Vec<usize> = selected
        .into_iter()
        .filter_map(|(c, keep)| keep.then_some(c))
        .collect();
    chosen.sort_unstable();
    chosen
}

fn assign_labels(condensed: &[CondensedEdge], selected: &[usize], n: usize) -> Vec<Option<usize>> {
    let parent_of: HashMap<usize, usize> = condensed.iter().map(|e| (e.child, e.parent)).collect();
    let label_of: HashMap<usize, usize> = selected
        .iter()
        .enumerate()
        .map(|(label, &cluster)| (cluster, label))
        .collect();

    (0..n)
        .map(|point| {
            let mut node = point;
            while let Some(&parent) = parent_of.get(&node) {
                if let Some(&label) = label_of.get(&parent) {
                    return Some(label);
                }
                node = parent;
            }
            None
        })
        .collect()
}
