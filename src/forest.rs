use crate::error::AppError;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Training parameters for the difficulty classifier ensemble.
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            seed: 42,
            max_depth: 32,
            min_samples_split: 2,
        }
    }
}

/// Random forest of Gini-impurity decision trees over binary labels.
///
/// Each tree is grown on a bootstrap sample with sqrt-of-features candidate
/// subsampling at every split. Training is deterministic for a fixed seed;
/// inference is pure and never fails.
#[derive(Debug)]
pub struct RandomForest {
    trees: Vec<TreeNode>,
}

#[derive(Debug)]
enum TreeNode {
    /// Fraction of positive (label 1) samples that reached this leaf.
    Leaf { prob: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl RandomForest {
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], params: &ForestParams) -> Result<Self, AppError> {
        if rows.is_empty() {
            return Err(AppError::ModelTraining(
                "Cannot train on an empty feature matrix".to_string(),
            ));
        }
        if rows.len() != labels.len() {
            return Err(AppError::ModelTraining(format!(
                "Feature matrix has {} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(AppError::ModelTraining(
                "Forest must have at least one tree".to_string(),
            ));
        }

        let n_features = rows[0].len();
        let features_per_split = ((n_features as f64).sqrt().round() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_trees)
            .map(|_| {
                let sample: Vec<usize> =
                    (0..rows.len()).map(|_| rng.gen_range(0..rows.len())).collect();
                build_tree(rows, labels, &sample, 0, features_per_split, params, &mut rng)
            })
            .collect();

        Ok(Self { trees })
    }

    /// Average the per-tree leaf distributions into P(label = 1).
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| predict_node(tree, row)).sum();
        total / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn build_tree(
    rows: &[Vec<f64>],
    labels: &[u8],
    indices: &[usize],
    depth: usize,
    features_per_split: usize,
    params: &ForestParams,
    rng: &mut StdRng,
) -> TreeNode {
    let prob = positive_fraction(labels, indices);

    let is_pure = prob == 0.0 || prob == 1.0;
    if is_pure || depth >= params.max_depth || indices.len() < params.min_samples_split {
        return TreeNode::Leaf { prob };
    }

    let n_features = rows[0].len();
    let candidates = rand::seq::index::sample(
        rng,
        n_features,
        features_per_split.min(n_features),
    );

    match find_best_split(rows, labels, indices, candidates.iter()) {
        Some((feature, threshold, left_indices, right_indices)) => {
            let left = build_tree(
                rows,
                labels,
                &left_indices,
                depth + 1,
                features_per_split,
                params,
                rng,
            );
            let right = build_tree(
                rows,
                labels,
                &right_indices,
                depth + 1,
                features_per_split,
                params,
                rng,
            );
            TreeNode::Split {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        None => TreeNode::Leaf { prob },
    }
}

/// Pick the feature/threshold pair minimizing weighted Gini impurity.
/// Returns None when no candidate split improves on the parent node.
fn find_best_split(
    rows: &[Vec<f64>],
    labels: &[u8],
    indices: &[usize],
    candidates: impl Iterator<Item = usize>,
) -> Option<(usize, f64, Vec<usize>, Vec<usize>)> {
    let parent_impurity = gini(labels, indices);
    let mut best_impurity = parent_impurity;
    let mut best_split = None;

    for feature in candidates {
        let mut values: Vec<(f64, usize)> =
            indices.iter().map(|&i| (rows[i][feature], i)).collect();
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        for i in 1..values.len() {
            if values[i - 1].0 == values[i].0 {
                continue;
            }
            let threshold = (values[i - 1].0 + values[i].0) / 2.0;
            let left: Vec<usize> = values[..i].iter().map(|&(_, idx)| idx).collect();
            let right: Vec<usize> = values[i..].iter().map(|&(_, idx)| idx).collect();

            let weighted = (left.len() as f64 * gini(labels, &left)
                + right.len() as f64 * gini(labels, &right))
                / indices.len() as f64;

            if weighted < best_impurity {
                best_impurity = weighted;
                best_split = Some((feature, threshold, left, right));
            }
        }
    }

    best_split
}

fn positive_fraction(labels: &[u8], indices: &[usize]) -> f64 {
    let positives = indices.iter().filter(|&&i| labels[i] == 1).count();
    positives as f64 / indices.len() as f64
}

fn gini(labels: &[u8], indices: &[usize]) -> f64 {
    let p = positive_fraction(labels, indices);
    2.0 * p * (1.0 - p)
}

fn predict_node(node: &TreeNode, row: &[f64]) -> f64 {
    match node {
        TreeNode::Leaf { prob } => *prob,
        TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let value = row.get(*feature).copied().unwrap_or(0.0);
            if value <= *threshold {
                predict_node(left, row)
            } else {
                predict_node(right, row)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_data() -> (Vec<Vec<f64>>, Vec<u8>) {
        // Class 1 clusters low on the first feature, class 0 high.
        let rows = vec![
            vec![0.1, 0.5],
            vec![0.2, 0.9],
            vec![0.15, 0.1],
            vec![0.9, 0.4],
            vec![0.8, 0.7],
            vec![0.95, 0.2],
        ];
        let labels = vec![1, 1, 1, 0, 0, 0];
        (rows, labels)
    }

    #[test]
    fn learns_separable_training_set() {
        let (rows, labels) = separable_data();
        let params = ForestParams {
            n_trees: 50,
            ..Default::default()
        };
        let forest = RandomForest::fit(&rows, &labels, &params).unwrap();

        for (row, label) in rows.iter().zip(&labels) {
            let prob = forest.predict_proba(row);
            if *label == 1 {
                assert!(prob > 0.5, "expected P > 0.5 for {row:?}, got {prob}");
            } else {
                assert!(prob < 0.5, "expected P < 0.5 for {row:?}, got {prob}");
            }
        }
    }

    #[test]
    fn predictions_are_probabilities() {
        let (rows, labels) = separable_data();
        let forest = RandomForest::fit(&rows, &labels, &ForestParams::default()).unwrap();
        for row in &rows {
            let prob = forest.predict_proba(row);
            assert!((0.0..=1.0).contains(&prob));
        }
        // Unseen point, still bounded.
        let prob = forest.predict_proba(&[0.5, 0.5]);
        assert!((0.0..=1.0).contains(&prob));
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let (rows, labels) = separable_data();
        let params = ForestParams::default();
        let a = RandomForest::fit(&rows, &labels, &params).unwrap();
        let b = RandomForest::fit(&rows, &labels, &params).unwrap();
        for row in &rows {
            assert_eq!(a.predict_proba(row), b.predict_proba(row));
        }
    }

    #[test]
    fn single_class_training_yields_constant_prediction() {
        let rows = vec![vec![0.1], vec![0.5], vec![0.9]];
        let labels = vec![1, 1, 1];
        let forest = RandomForest::fit(&rows, &labels, &ForestParams::default()).unwrap();
        assert_eq!(forest.predict_proba(&[0.3]), 1.0);
    }

    #[test]
    fn forest_is_debug_formattable() {
        let (rows, labels) = separable_data();
        let params = ForestParams {
            n_trees: 2,
            ..Default::default()
        };
        let forest = RandomForest::fit(&rows, &labels, &params).unwrap();
        let rendered = format!("{forest:?}");
        assert!(rendered.contains("RandomForest"));
    }

    #[test]
    fn empty_training_set_is_an_error() {
        let err = RandomForest::fit(&[], &[], &ForestParams::default()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn mismatched_labels_are_an_error() {
        let rows = vec![vec![0.1], vec![0.5]];
        let err = RandomForest::fit(&rows, &[1], &ForestParams::default()).unwrap_err();
        assert!(err.to_string().contains("labels"));
    }
}
