//! Statistical-learning primitives
//!
//! Standard scaling, CART regression trees, gradient boosting, evaluation
//! metrics and seeded partitioning. All randomness is driven by explicit
//! seeds so training runs are reproducible.

mod boosting;
pub mod metrics;
mod scaler;
mod split;
mod tree;

pub use boosting::{BoostingConfig, GradientBoostingRegressor};
pub use metrics::RegressionMetrics;
pub use scaler::StandardScaler;
pub use split::{train_test_split, SplitIndices};
pub use tree::{Node, RegressionTree, TreeParams};
