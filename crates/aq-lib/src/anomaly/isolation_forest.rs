//! Isolation forest out-of-distribution detector
//!
//! Each tree isolates points with random axis-aligned cuts on a random
//! subsample. Points that are isolated in few cuts score close to 1, points
//! deep inside the training cloud score near 0.5 or below. The decision
//! threshold is the score percentile matching the expected contamination.

use crate::error::{PipelineError, Result};
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Euler-Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Forest hyper-parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForestConfig {
    pub n_estimators: usize,
    /// Upper bound on the per-tree subsample
    pub max_samples: usize,
    /// Expected share of outliers in the training data
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            max_samples: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

/// Detector output for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Inlier,
    Outlier,
}

impl Verdict {
    /// Conventional label: 1 inlier, -1 outlier
    pub fn label(self) -> i8 {
        match self {
            Verdict::Inlier => 1,
            Verdict::Outlier => -1,
        }
    }

    pub fn is_outlier(self) -> bool {
        self == Verdict::Outlier
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum IsolationNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<IsolationNode>,
}

impl IsolationTree {
    fn build(
        x: ArrayView2<'_, f64>,
        sample: Vec<usize>,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, sample, 0, height_limit, rng);
        tree
    }

    fn grow(
        &mut self,
        x: ArrayView2<'_, f64>,
        indices: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(IsolationNode::Leaf {
            size: indices.len(),
        });
        if depth >= height_limit || indices.len() <= 1 {
            return id;
        }

        // Visit features in random order and cut the first non-constant one
        let mut features: Vec<usize> = (0..x.ncols()).collect();
        features.shuffle(rng);
        let cut = features.into_iter().find_map(|f| {
            let column = x.column(f);
            let (lo, hi) = indices
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    (lo.min(column[i]), hi.max(column[i]))
                });
            (hi > lo).then_some((f, lo, hi))
        });
        let Some((feature, lo, hi)) = cut else {
            return id;
        };

        let threshold = rng.gen_range(lo..hi);
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] <= threshold);
        let left = self.grow(x, left_idx, depth + 1, height_limit, rng);
        let right = self.grow(x, right_idx, depth + 1, height_limit, rng);
        self.nodes[id] = IsolationNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Depth at which `row` lands, adjusted for the unexpanded leaf size
    fn path_length(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes.get(id) {
                Some(IsolationNode::Leaf { size }) => return depth + average_path_length(*size),
                Some(IsolationNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    depth += 1.0;
                }
                None => return depth,
            }
        }
    }

    fn is_well_formed(&self, n_features: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(id, n)| match n {
                IsolationNode::Leaf { .. } => true,
                IsolationNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < n_features
                        && threshold.is_finite()
                        && *left > id
                        && *right > id
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

/// Average path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile, `q` in [0, 100]
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = q.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Fitted isolation forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    n_features: usize,
    sample_size: usize,
    /// Anomaly score above which a row is an outlier
    threshold: f64,
    trees: Vec<IsolationTree>,
}

impl IsolationForest {
    pub fn fit(x: ArrayView2<'_, f64>, config: &IsolationForestConfig) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(PipelineError::EmptyDataset(
                "cannot fit isolation forest on zero rows".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&config.contamination) {
            return Err(PipelineError::Shape(format!(
                "contamination {} is outside [0, 0.5)",
                config.contamination
            )));
        }
        let n_features = x.ncols();
        let n = x.nrows();
        let sample_size = config.max_samples.clamp(1, n);
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let trees = (0..config.n_estimators)
            .map(|_| {
                let sample = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::build(x, sample, height_limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            n_features,
            sample_size,
            threshold: 0.0,
            trees,
        };
        let scores: Vec<f64> = x.rows().into_iter().map(|row| forest.raw_score(row)).collect();
        forest.threshold = percentile(&scores, 100.0 * (1.0 - config.contamination));
        Ok(forest)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn raw_score(&self, row: ArrayView1<'_, f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let mean_depth =
            self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_depth / norm)
    }

    /// Anomaly score in (0, 1]; higher is more anomalous
    pub fn score_row(&self, row: ArrayView1<'_, f64>) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(PipelineError::FeatureAlignment(format!(
                "OOD detector expects {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        Ok(self.raw_score(row))
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<Verdict> {
        let score = self.score_row(row)?;
        Ok(if score > self.threshold {
            Verdict::Outlier
        } else {
            Verdict::Inlier
        })
    }

    /// Structural check for a deserialized detector
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| PipelineError::InvalidArtifact {
            name: "ood_detector".to_string(),
            reason,
        };
        if !self.threshold.is_finite() {
            return Err(invalid("non-finite threshold".to_string()));
        }
        if self.trees.is_empty() {
            return Err(invalid("no trees".to_string()));
        }
        if let Some(i) = self
            .trees
            .iter()
            .position(|t| !t.is_well_formed(self.n_features))
        {
            return Err(invalid(format!("tree {} is malformed", i)));
        }
        Ok(())
    }
}
