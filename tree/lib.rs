/*!
This crate defines the [`Ensemble`](struct.Ensemble.html) of decision trees that `gbeval` evaluates, loads it from a file, and applies its trees to blocks of documents. Each tree maps a document to a leaf, and each leaf holds one value per output dimension of the model.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod apply;
mod load;

pub use self::apply::{apply_tree, TreeApplication};
pub use self::load::ModelFormat;

use gbeval_dataframe::{ColumnDescription, ColumnRole, ColumnType};
use thiserror::Error;

/// An `Ensemble` is a trained sequence of trees whose outputs are combined stage by stage into a prediction.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ensemble {
	/// The loss function the ensemble was trained with. It determines whether tree outputs are combined additively or multiplicatively.
	pub loss_function: String,
	/// The number of output dimensions. This is 1 for regression and binary classification and the number of classes for multiclass classification.
	pub approx_dimension: usize,
	/// Every leaf value is scaled by the learning rate when it is applied.
	#[serde(default = "default_learning_rate")]
	pub learning_rate: f64,
	/// The type of each feature the trees split on, in feature order.
	pub features: Vec<ColumnType>,
	/// The names of the classes for classification models, in class index order.
	#[serde(default)]
	pub class_names: Vec<String>,
	pub trees: Vec<Tree>,
}

fn default_learning_rate() -> f64 {
	1.0
}

/// Trees are stored as a `Vec` of `Node`s. The root is the first node, and each branch holds the indexes of its two children, which always come after it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Node {
	#[serde(rename = "branch")]
	Branch(BranchNode),
	#[serde(rename = "leaf")]
	Leaf(LeafNode),
}

/// A `BranchNode` is a branch in a tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BranchNode {
	/// This is the index in the tree's node vector for this node's left child.
	pub left_child_index: usize,
	/// This is the index in the tree's node vector for this node's right child.
	pub right_child_index: usize,
	/// When applying the tree, a document will be sent either to the right or left child. The `split` contains the information necessary to determine which way it will go.
	pub split: BranchSplit,
}

/// A `BranchSplit` describes how documents are sent to the left or right child given their feature values. A `Continuous` split is used for number features, and `Discrete` is used for enum features.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum BranchSplit {
	#[serde(rename = "continuous")]
	Continuous(BranchSplitContinuous),
	#[serde(rename = "discrete")]
	Discrete(BranchSplitDiscrete),
}

/// A continuous branch split takes the value of a single number feature, compares it with a `split_value`, and if the value is <= `split_value`, the document is sent left, and if it is > `split_value`, it is sent right.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BranchSplitContinuous {
	/// This is the index of the feature to get the value for.
	pub feature_index: usize,
	/// This is the threshold value of the split.
	pub split_value: f32,
	/// This is the direction missing values should be sent.
	#[serde(default)]
	pub invalid_values_direction: SplitDirection,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SplitDirection {
	#[serde(rename = "left")]
	Left,
	#[serde(rename = "right")]
	Right,
}

impl Default for SplitDirection {
	fn default() -> Self {
		SplitDirection::Left
	}
}

/// A discrete branch split takes the value of a single enum feature and looks up which way the document should be sent. `directions[0]` is used for values that are not among the feature's options, and `directions[i]` for the option with index `i - 1`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BranchSplitDiscrete {
	/// This is the index of the feature to get the value for.
	pub feature_index: usize,
	pub directions: Vec<SplitDirection>,
}

/// The leaves in a tree hold the values to output for documents that get sent to them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LeafNode {
	/// One value per output dimension.
	pub values: Vec<f64>,
}

impl BranchSplit {
	pub fn feature_index(&self) -> usize {
		match self {
			Self::Continuous(b) => b.feature_index,
			Self::Discrete(b) => b.feature_index,
		}
	}
}

#[derive(Debug, Error)]
pub enum ModelError {
	#[error("failed to read the model file {}: {source}", path.display())]
	Io {
		path: std::path::PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse the model: {0}")]
	Json(#[from] serde_json::Error),
	#[error("failed to decode the model: {0}")]
	MessagePackDecode(#[from] rmp_serde::decode::Error),
	#[error("failed to encode the model: {0}")]
	MessagePackEncode(#[from] rmp_serde::encode::Error),
	#[error("invalid model: {0}")]
	Invalid(String),
	#[error("tree {tree_index} leaf {node_index} has {found} values, but the approx dimension is {expected}")]
	LeafDimension {
		tree_index: usize,
		node_index: usize,
		expected: usize,
		found: usize,
	},
	#[error("the model has categorical features; specify a column description file that marks them as categorical")]
	MissingColumnDescription,
	#[error("feature {feature_index} is {expected} in the model but {found} in the column description")]
	FeatureTypeMismatch {
		feature_index: usize,
		expected: &'static str,
		found: &'static str,
	},
}

impl Ensemble {
	pub fn n_trees(&self) -> usize {
		self.trees.len()
	}

	pub fn n_categorical_features(&self) -> usize {
		self.features
			.iter()
			.filter(|feature| feature.is_enum())
			.count()
	}

	/// Check that every tree is well formed and agrees with the model's approx dimension and feature types.
	pub fn validate(&self) -> Result<(), ModelError> {
		if self.approx_dimension == 0 {
			return Err(ModelError::Invalid(
				"the approx dimension must be positive".to_owned(),
			));
		}
		if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
			return Err(ModelError::Invalid(format!(
				"the learning rate must be positive, got {}",
				self.learning_rate
			)));
		}
		for (tree_index, tree) in self.trees.iter().enumerate() {
			self.validate_tree(tree_index, tree)?;
		}
		Ok(())
	}

	fn validate_tree(&self, tree_index: usize, tree: &Tree) -> Result<(), ModelError> {
		let invalid = |node_index: usize, message: String| {
			ModelError::Invalid(format!(
				"tree {} node {}: {}",
				tree_index, node_index, message
			))
		};
		if tree.nodes.is_empty() {
			return Err(ModelError::Invalid(format!("tree {} has no nodes", tree_index)));
		}
		let n_nodes = tree.nodes.len();
		for (node_index, node) in tree.nodes.iter().enumerate() {
			match node {
				Node::Branch(branch) => {
					for child_index in [branch.left_child_index, branch.right_child_index].iter() {
						if *child_index <= node_index || *child_index >= n_nodes {
							return Err(invalid(
								node_index,
								format!("child index {} is out of range", child_index),
							));
						}
					}
					let feature_index = branch.split.feature_index();
					let feature = self.features.get(feature_index).ok_or_else(|| {
						invalid(
							node_index,
							format!("feature index {} is out of range", feature_index),
						)
					})?;
					match (&branch.split, feature) {
						(BranchSplit::Continuous(_), ColumnType::Number) => {}
						(BranchSplit::Discrete(split), ColumnType::Enum { options }) => {
							if split.directions.len() != options.len() + 1 {
								return Err(invalid(
									node_index,
									format!(
										"discrete split has {} directions, expected {}",
										split.directions.len(),
										options.len() + 1
									),
								));
							}
						}
						_ => {
							return Err(invalid(
								node_index,
								format!("split type does not match the type of feature {}", feature_index),
							))
						}
					}
				}
				Node::Leaf(leaf) => {
					if leaf.values.len() != self.approx_dimension {
						return Err(ModelError::LeafDimension {
							tree_index,
							node_index,
							expected: self.approx_dimension,
							found: leaf.values.len(),
						});
					}
				}
			}
		}
		Ok(())
	}

	/**
	Check that the dataset's column description can supply the model's categorical features. This must run before any data is read: a model with categorical features cannot be evaluated without a column description marking the same features as categorical.
	*/
	pub fn check_column_description(
		&self,
		column_description: Option<&ColumnDescription>,
	) -> Result<(), ModelError> {
		let column_description = match column_description {
			Some(column_description) => column_description,
			None if self.n_categorical_features() > 0 => {
				return Err(ModelError::MissingColumnDescription)
			}
			None => return Ok(()),
		};
		let roles = column_description.described_feature_roles();
		for (feature_index, feature) in self.features.iter().enumerate() {
			let role = roles.get(feature_index).copied().unwrap_or(ColumnRole::Num);
			match (feature.is_enum(), role) {
				(true, ColumnRole::Categ) | (false, ColumnRole::Num) => {}
				(true, _) => {
					return Err(ModelError::FeatureTypeMismatch {
						feature_index,
						expected: "categorical",
						found: "numeric",
					})
				}
				(false, _) => {
					return Err(ModelError::FeatureTypeMismatch {
						feature_index,
						expected: "numeric",
						found: "categorical",
					})
				}
			}
		}
		Ok(())
	}
}

#[cfg(test)]
pub(crate) fn stump(feature_index: usize, split_value: f32, left: f64, right: f64) -> Tree {
	Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 1,
				right_child_index: 2,
				split: BranchSplit::Continuous(BranchSplitContinuous {
					feature_index,
					split_value,
					invalid_values_direction: SplitDirection::Right,
				}),
			}),
			Node::Leaf(LeafNode { values: vec![left] }),
			Node::Leaf(LeafNode { values: vec![right] }),
		],
	}
}

#[cfg(test)]
fn color_model() -> Ensemble {
	Ensemble {
		loss_function: "RMSE".to_owned(),
		approx_dimension: 1,
		learning_rate: 1.0,
		features: vec![
			ColumnType::Number,
			ColumnType::Enum {
				options: vec!["red".to_owned(), "blue".to_owned()],
			},
		],
		class_names: vec![],
		trees: vec![stump(0, 0.5, -1.0, 1.0)],
	}
}

#[test]
fn test_validate_rejects_bad_child_index() {
	let mut model = color_model();
	assert!(model.validate().is_ok());
	if let Node::Branch(branch) = &mut model.trees[0].nodes[0] {
		branch.right_child_index = 0;
	}
	assert!(matches!(model.validate(), Err(ModelError::Invalid(_))));
}

#[test]
fn test_validate_rejects_leaf_dimension_mismatch() {
	let mut model = color_model();
	model.approx_dimension = 2;
	assert!(matches!(
		model.validate(),
		Err(ModelError::LeafDimension {
			expected: 2,
			found: 1,
			..
		})
	));
}

#[test]
fn test_check_column_description() {
	let model = color_model();
	assert!(matches!(
		model.check_column_description(None),
		Err(ModelError::MissingColumnDescription)
	));
	let column_description: ColumnDescription = "0\tLabel\n2\tCateg\n".parse().unwrap();
	assert!(model.check_column_description(Some(&column_description)).is_ok());
	let column_description: ColumnDescription = "0\tLabel\n1\tCateg\n".parse().unwrap();
	assert!(matches!(
		model.check_column_description(Some(&column_description)),
		Err(ModelError::FeatureTypeMismatch {
			feature_index: 0,
			..
		})
	));
	let mut numeric_model = color_model();
	numeric_model.features.truncate(1);
	assert!(numeric_model.check_column_description(None).is_ok());
}
