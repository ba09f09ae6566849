//! CART regression tree (squared-error criterion)
//!
//! Nodes live in a flat arena; children are referenced by index. Splits
//! send `x <= threshold` left, with thresholds at the midpoint between two
//! consecutive distinct values.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 4,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl RegressionTree {
    /// Fit on the rows of `x` listed in `indices`
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        indices: &[usize],
        params: &TreeParams,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, indices.to_vec(), 0, params);
        tree
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    id = if v <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    /// Largest feature index referenced by any split
    pub fn max_feature_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }

    /// Every child index points inside the arena and after its parent
    pub fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(id, n)| match n {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    left,
                    right,
                    threshold,
                    ..
                } => {
                    *left > id
                        && *right > id
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                        && threshold.is_finite()
                }
            })
    }

    fn grow(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        indices: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let id = self.nodes.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len().max(1) as f64;
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= params.max_depth || indices.len() < params.min_samples_split.max(2) {
            return id;
        }
        let Some(split) = best_split(x, y, &indices, params.min_samples_leaf.max(1)) else {
            return id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, split.feature]] <= split.threshold);
        let left = self.grow(x, y, left_idx, depth + 1, params);
        let right = self.grow(x, y, right_idx, depth + 1, params);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

/// Exhaustive search for the split with the largest squared-error reduction
fn best_split(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    indices: &[usize],
    min_leaf: usize,
) -> Option<BestSplit> {
    let n = indices.len();
    if n < 2 * min_leaf {
        return None;
    }
    let total: f64 = indices.iter().map(|&i| y[i]).sum();
    // Maximising sum_l^2/n_l + sum_r^2/n_r minimises the summed squared error
    let parent_score = total * total / n as f64;

    let mut best: Option<BestSplit> = None;
    let mut order = indices.to_vec();
    for (feature, column) in x.columns().into_iter().enumerate() {
        order.sort_by(|&a, &b| {
            column[a]
                .partial_cmp(&column[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_sum = 0.0;
        for k in 0..n - 1 {
            left_sum += y[order[k]];
            let n_left = k + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let lo = column[order[k]];
            let hi = column[order[k + 1]];
            if hi <= lo {
                continue;
            }
            let right_sum = total - left_sum;
            let score =
                left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
            let improves = match &best {
                Some(b) => score > b.score,
                None => score > parent_score + 1e-12 * parent_score.abs().max(1.0),
            };
            if improves {
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    score,
                });
            }
        }
    }
    best
}
