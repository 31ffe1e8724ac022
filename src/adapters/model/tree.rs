//! Flat decision trees as exported from scikit-learn estimators.

use serde::{Deserialize, Serialize};

/// One node of a flattened tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Internal node: go `left` when `x[feature] <= threshold`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A decision tree rooted at node 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Structural check run once at load.
    ///
    /// Children must point strictly forward, which guarantees every walk
    /// reaches a leaf. `leaf_range` bounds the accepted leaf values.
    pub fn validate(&self, n_features: usize, leaf_range: (f64, f64)) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i} has a non-finite threshold"));
                    }
                    for child in [left, right] {
                        if child <= i || child >= len {
                            return Err(format!("node {i} has invalid child index {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() || value < leaf_range.0 || value > leaf_range.1 {
                        return Err(format!("node {i} has leaf value {value} outside {leaf_range:?}"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by `x`. The tree must have passed [`Self::validate`].
    #[must_use]
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f64, low: f64, high: f64) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: low },
                TreeNode::Leaf { value: high },
            ],
        }
    }

    #[test]
    fn test_threshold_goes_left() {
        let tree = stump(0.5, 0.1, 0.9);
        assert_eq!(tree.evaluate(&[0.5]), 0.1);
        assert_eq!(tree.evaluate(&[0.51]), 0.9);
    }

    #[test]
    fn test_untagged_nodes_parse() {
        let json = r#"{"nodes": [
            {"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
            {"value": 0.2},
            {"value": 0.8}
        ]}"#;
        let tree: DecisionTree = serde_json::from_str(json).expect("Should parse");
        assert_eq!(tree, stump(0.5, 0.2, 0.8));
    }

    #[test]
    fn test_validate_rejects_backward_child() {
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 1,
                },
                TreeNode::Leaf { value: 0.0 },
            ],
        };
        assert!(tree.validate(1, (0.0, 1.0)).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_feature_and_leaf() {
        assert!(stump(0.5, 0.1, 0.9).validate(1, (0.0, 1.0)).is_ok());
        assert!(stump(0.5, 0.1, 0.9).validate(0, (0.0, 1.0)).is_err());
        assert!(stump(0.5, 0.1, 1.5).validate(1, (0.0, 1.0)).is_err());
        assert!(DecisionTree { nodes: vec![] }.validate(1, (0.0, 1.0)).is_err());
    }
}
