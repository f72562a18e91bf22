use super::{
	BranchNode, BranchSplit, BranchSplitContinuous, BranchSplitDiscrete, LeafNode, Node,
	SplitDirection, Tree,
};
use gbeval_util::{pzip, WorkerPool};
use ndarray::{parallel::prelude::*, prelude::*};

/// The result of applying one tree to a block of documents.
#[derive(Debug, PartialEq)]
pub struct TreeApplication {
	/// (n_documents) The index in the tree's node vector of the leaf each document reached.
	pub leaf_indices: Vec<usize>,
	/// (approx_dimension, n_documents) The values of the leaf each document reached.
	pub deltas: Array2<f64>,
}

impl Tree {
	/// Find the leaf that a document with the given feature values reaches. Returns the leaf's index in the node vector.
	pub fn leaf_index(&self, features: ArrayView1<f32>) -> usize {
		// Start at the root node.
		let mut node_index = 0;
		// Traverse the tree until we get to a leaf.
		loop {
			match &self.nodes[node_index] {
				Node::Branch(BranchNode {
					left_child_index,
					right_child_index,
					split:
						BranchSplit::Continuous(BranchSplitContinuous {
							feature_index,
							split_value,
							invalid_values_direction,
						}),
				}) => {
					let feature_value = features[*feature_index];
					let direction = if feature_value.is_nan() {
						*invalid_values_direction
					} else if feature_value <= *split_value {
						SplitDirection::Left
					} else {
						SplitDirection::Right
					};
					node_index = match direction {
						SplitDirection::Left => *left_child_index,
						SplitDirection::Right => *right_child_index,
					};
				}
				Node::Branch(BranchNode {
					left_child_index,
					right_child_index,
					split:
						BranchSplit::Discrete(BranchSplitDiscrete {
							feature_index,
							directions,
						}),
				}) => {
					let option_index = features[*feature_index] as usize;
					let direction = directions
						.get(option_index)
						.copied()
						.unwrap_or(SplitDirection::Left);
					node_index = match direction {
						SplitDirection::Left => *left_child_index,
						SplitDirection::Right => *right_child_index,
					};
				}
				Node::Leaf(_) => return node_index,
			}
		}
	}

	/// The values of the leaf at `leaf_index`, as returned by [`leaf_index`](#method.leaf_index).
	pub fn leaf_values(&self, leaf_index: usize) -> &[f64] {
		match &self.nodes[leaf_index] {
			Node::Leaf(LeafNode { values }) => values.as_slice(),
			Node::Branch(_) => &[],
		}
	}
}

/**
Apply `tree` to every row of `features`, which has shape (n_documents, n_features). Each document is independent, so both the traversal and the gathering of leaf values run in parallel on `pool`.
*/
pub fn apply_tree(
	pool: &WorkerPool,
	tree: &Tree,
	approx_dimension: usize,
	features: ArrayView2<f32>,
) -> TreeApplication {
	let n_documents = features.nrows();
	let mut deltas = Array2::zeros((approx_dimension, n_documents));
	let leaf_indices = pool.install(|| {
		let leaf_indices: Vec<usize> = features
			.axis_iter(Axis(0))
			.into_par_iter()
			.map(|row| tree.leaf_index(row))
			.collect();
		pzip!(deltas.axis_iter_mut(Axis(1)), &leaf_indices).for_each(
			|(mut document_deltas, leaf_index)| {
				document_deltas.assign(&ArrayView1::from(tree.leaf_values(*leaf_index)));
			},
		);
		leaf_indices
	});
	TreeApplication {
		leaf_indices,
		deltas,
	}
}

#[cfg(test)]
fn two_feature_tree() -> Tree {
	// A continuous split on feature 0 with a discrete split on feature 1 below its right child.
	Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 1,
				right_child_index: 2,
				split: BranchSplit::Continuous(BranchSplitContinuous {
					feature_index: 0,
					split_value: 1.0,
					invalid_values_direction: SplitDirection::Right,
				}),
			}),
			Node::Leaf(LeafNode {
				values: vec![1.0, -1.0],
			}),
			Node::Branch(BranchNode {
				left_child_index: 3,
				right_child_index: 4,
				split: BranchSplit::Discrete(BranchSplitDiscrete {
					feature_index: 1,
					directions: vec![
						SplitDirection::Left,
						SplitDirection::Right,
						SplitDirection::Left,
					],
				}),
			}),
			Node::Leaf(LeafNode {
				values: vec![2.0, -2.0],
			}),
			Node::Leaf(LeafNode {
				values: vec![3.0, -3.0],
			}),
		],
	}
}

#[test]
fn test_leaf_index() {
	let tree = two_feature_tree();
	assert_eq!(tree.leaf_index(arr1(&[0.5, 1.0]).view()), 1);
	assert_eq!(tree.leaf_index(arr1(&[1.0, 1.0]).view()), 1);
	assert_eq!(tree.leaf_index(arr1(&[1.5, 1.0]).view()), 4);
	assert_eq!(tree.leaf_index(arr1(&[1.5, 2.0]).view()), 3);
	assert_eq!(tree.leaf_index(arr1(&[std::f32::NAN, 0.0]).view()), 3);
}

#[test]
fn test_apply_tree() {
	let pool = WorkerPool::new(2).unwrap();
	let tree = two_feature_tree();
	let features = arr2(&[[0.0, 0.0], [2.0, 1.0], [2.0, 2.0]]);
	let application = apply_tree(&pool, &tree, 2, features.view());
	assert_eq!(application.leaf_indices, vec![1, 4, 3]);
	assert_eq!(
		application.deltas,
		arr2(&[[1.0, 3.0, 2.0], [-1.0, -3.0, -2.0]])
	);
}

#[test]
fn test_apply_tree_is_deterministic() {
	let pool = WorkerPool::new(4).unwrap();
	let tree = super::stump(0, 0.0, -1.0, 1.0);
	let features = Array2::from_shape_fn((1000, 1), |(i, _)| (i as f32) - 500.0);
	let first = apply_tree(&pool, &tree, 1, features.view());
	let second = apply_tree(&pool, &tree, 1, features.view());
	assert_eq!(first, second);
	assert_eq!(first.deltas.sum(), -2.0);
}
