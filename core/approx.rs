/*!
This module tracks the running prediction of every document as trees are applied one after another. The combination rule depends on the loss function the ensemble was trained with and is fixed for a whole run.
*/

use super::Error;
use gbeval_tree::{apply_tree, Ensemble};
use gbeval_util::{pzip, WorkerPool};
use ndarray::{parallel::prelude::*, prelude::*, CowArray};
use std::ops::Range;

/// Loss functions whose trees are trained in log space. Their approxes are stored exponentiated and combined by multiplication.
const MULTIPLICATIVE_LOSS_FUNCTIONS: &[&str] = &[
	"Logloss",
	"LogLinQuantile",
	"Poisson",
	"CrossEntropy",
	"PairLogit",
	"PairLogitPairwise",
	"YetiRank",
	"YetiRankPairwise",
];

/**
The rule that combines tree outputs into a document's approx.

The multiplicative rule stores `exp` of the raw approx, so it only represents raw values of magnitude up to about 709. Beyond that the stored value saturates to `inf` or `0` and `to_raw` returns `inf` or `-inf`. Once a stored value is `0`, further updates leave it at `0`.
*/
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ApproxUpdater {
	/// `approx += delta * learning_rate`
	Additive,
	/// `approx *= exp(ln(delta) * learning_rate)`, where `delta` is an exponentiated leaf value.
	Multiplicative,
}

impl ApproxUpdater {
	/// Choose the combination rule for a loss function. Parameters after a `:` are ignored.
	pub fn for_loss_function(loss_function: &str) -> ApproxUpdater {
		let name = loss_function
			.split(':')
			.next()
			.unwrap_or(loss_function)
			.trim();
		if MULTIPLICATIVE_LOSS_FUNCTIONS.contains(&name) {
			ApproxUpdater::Multiplicative
		} else {
			ApproxUpdater::Additive
		}
	}

	/// The approx of a document before any tree is applied.
	pub fn neutral(self) -> f64 {
		match self {
			ApproxUpdater::Additive => 0.0,
			ApproxUpdater::Multiplicative => 1.0,
		}
	}

	pub fn neutral_approx(self, approx_dimension: usize, n_documents: usize) -> Array2<f64> {
		Array2::from_elem((approx_dimension, n_documents), self.neutral())
	}

	/// Turn leaf values into the deltas this rule combines.
	pub fn prepare_deltas(self, leaf_values: &mut Array2<f64>) {
		if self == ApproxUpdater::Multiplicative {
			leaf_values.mapv_inplace(f64::exp);
		}
	}

	pub fn update(self, approx: f64, delta: f64, learning_rate: f64) -> f64 {
		match self {
			ApproxUpdater::Additive => approx + delta * learning_rate,
			ApproxUpdater::Multiplicative => approx * (delta.ln() * learning_rate).exp(),
		}
	}

	/// Combine `deltas` into `approx`, both of shape (approx_dimension, n_documents). Each document is updated independently on `pool`.
	pub fn update_approx(
		self,
		pool: &WorkerPool,
		mut approx: ArrayViewMut2<f64>,
		deltas: ArrayView2<f64>,
		learning_rate: f64,
	) -> Result<(), Error> {
		if approx.dim() != deltas.dim() {
			return Err(Error::DataShape(format!(
				"deltas have shape {:?} but the approx has shape {:?}",
				deltas.dim(),
				approx.dim()
			)));
		}
		pool.install(|| {
			pzip!(approx.axis_iter_mut(Axis(1)), deltas.axis_iter(Axis(1))).for_each(
				|(mut document_approx, document_deltas)| {
					for (approx, delta) in document_approx.iter_mut().zip(document_deltas.iter()) {
						*approx = self.update(*approx, *delta, learning_rate);
					}
				},
			);
		});
		Ok(())
	}

	/// Map a stored approx back to the model's raw output scale, which is what metrics are computed on.
	pub fn to_raw<'a>(self, approx: ArrayView2<'a, f64>) -> CowArray<'a, f64, Ix2> {
		match self {
			ApproxUpdater::Additive => approx.into(),
			ApproxUpdater::Multiplicative => approx.mapv(f64::ln).into(),
		}
	}

	/// Apply the trees in `trees` to the documents in `features`, in order, combining each tree's output into `approx`.
	pub fn advance(
		self,
		pool: &WorkerPool,
		ensemble: &Ensemble,
		features: ArrayView2<f32>,
		approx: &mut Array2<f64>,
		trees: Range<usize>,
	) -> Result<(), Error> {
		let n_trees = ensemble.n_trees();
		let trees = ensemble.trees.get(trees.clone()).ok_or_else(|| {
			Error::Configuration(format!(
				"cannot apply trees {:?} of a model with {} trees",
				trees, n_trees
			))
		})?;
		if features.nrows() != approx.ncols() {
			return Err(Error::DataShape(format!(
				"the block has {} documents but the approx has {}",
				features.nrows(),
				approx.ncols()
			)));
		}
		// Split feature indexes were checked against `ensemble.features` when the model was validated.
		if features.ncols() < ensemble.features.len() {
			return Err(Error::DataShape(format!(
				"the block has {} feature columns but the model has {} features",
				features.ncols(),
				ensemble.features.len()
			)));
		}
		for tree in trees {
			let mut deltas = apply_tree(pool, tree, ensemble.approx_dimension, features).deltas;
			self.prepare_deltas(&mut deltas);
			self.update_approx(pool, approx.view_mut(), deltas.view(), ensemble.learning_rate)?;
		}
		Ok(())
	}
}

#[cfg(test)]
pub(crate) fn test_ensemble(loss_function: &str, learning_rate: f64) -> Ensemble {
	use gbeval_dataframe::ColumnType;
	use gbeval_tree::{
		BranchNode, BranchSplit, BranchSplitContinuous, LeafNode, Node, SplitDirection, Tree,
	};
	let stump = |split_value: f32, left: f64, right: f64| Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 1,
				right_child_index: 2,
				split: BranchSplit::Continuous(BranchSplitContinuous {
					feature_index: 0,
					split_value,
					invalid_values_direction: SplitDirection::Left,
				}),
			}),
			Node::Leaf(LeafNode { values: vec![left] }),
			Node::Leaf(LeafNode { values: vec![right] }),
		],
	};
	Ensemble {
		loss_function: loss_function.to_owned(),
		approx_dimension: 1,
		learning_rate,
		features: vec![ColumnType::Number],
		class_names: vec![],
		trees: vec![stump(0.0, -1.0, 1.0), stump(1.0, 0.5, -0.25), stump(-1.0, 0.2, 0.1)],
	}
}

#[test]
fn test_for_loss_function() {
	assert_eq!(
		ApproxUpdater::for_loss_function("Logloss"),
		ApproxUpdater::Multiplicative
	);
	assert_eq!(
		ApproxUpdater::for_loss_function("YetiRank:top=10"),
		ApproxUpdater::Multiplicative
	);
	assert_eq!(
		ApproxUpdater::for_loss_function("RMSE"),
		ApproxUpdater::Additive
	);
	assert_eq!(
		ApproxUpdater::for_loss_function("MultiClass"),
		ApproxUpdater::Additive
	);
}

#[test]
fn test_neutral_delta_is_identity() {
	let pool = WorkerPool::new(2).unwrap();
	for updater in [ApproxUpdater::Additive, ApproxUpdater::Multiplicative].iter() {
		let mut approx = arr2(&[[0.5, 2.0, 3.0]]);
		let before = approx.clone();
		let mut deltas = Array2::zeros((1, 3));
		updater.prepare_deltas(&mut deltas);
		updater
			.update_approx(&pool, approx.view_mut(), deltas.view(), 0.3)
			.unwrap();
		assert_eq!(approx, before);
	}
}

#[test]
fn test_update_from_neutral_scales_delta() {
	let pool = WorkerPool::new(2).unwrap();
	let leaf_values = arr2(&[[-1.5, 0.0, 2.0], [0.25, -0.75, 1.0]]);
	for learning_rate in [0.1, 0.5, 1.0].iter() {
		let mut approx = ApproxUpdater::Additive.neutral_approx(2, 3);
		ApproxUpdater::Additive
			.update_approx(&pool, approx.view_mut(), leaf_values.view(), *learning_rate)
			.unwrap();
		for (a, value) in approx.iter().zip(leaf_values.iter()) {
			assert_eq!(*a, value * learning_rate);
		}
		let mut deltas = leaf_values.clone();
		ApproxUpdater::Multiplicative.prepare_deltas(&mut deltas);
		let mut approx = ApproxUpdater::Multiplicative.neutral_approx(2, 3);
		ApproxUpdater::Multiplicative
			.update_approx(&pool, approx.view_mut(), deltas.view(), *learning_rate)
			.unwrap();
		for (a, delta) in approx.iter().zip(deltas.iter()) {
			assert!((a - delta.powf(*learning_rate)).abs() < 1e-12);
		}
		let raw = ApproxUpdater::Multiplicative.to_raw(approx.view());
		for (a, value) in raw.iter().zip(leaf_values.iter()) {
			assert!((a - value * learning_rate).abs() < 1e-12);
		}
	}
}

#[test]
fn test_advance_is_associative() {
	let pool = WorkerPool::new(2).unwrap();
	let features = arr2(&[[-2.0f32], [0.5], [3.0], [std::f32::NAN]]);
	for loss_function in ["RMSE", "Logloss"].iter() {
		let ensemble = test_ensemble(loss_function, 0.1);
		let updater = ApproxUpdater::for_loss_function(loss_function);
		let mut whole = updater.neutral_approx(1, 4);
		updater
			.advance(&pool, &ensemble, features.view(), &mut whole, 0..3)
			.unwrap();
		let mut parts = updater.neutral_approx(1, 4);
		updater
			.advance(&pool, &ensemble, features.view(), &mut parts, 0..1)
			.unwrap();
		updater
			.advance(&pool, &ensemble, features.view(), &mut parts, 1..3)
			.unwrap();
		for (a, b) in whole.iter().zip(parts.iter()) {
			assert!((a - b).abs() < 1e-12);
		}
	}
}

#[test]
fn test_multiplicative_raw_approx_matches_additive() {
	let pool = WorkerPool::new(2).unwrap();
	let features = arr2(&[[-2.0f32], [0.5], [3.0]]);
	let mut additive = ApproxUpdater::Additive.neutral_approx(1, 3);
	ApproxUpdater::Additive
		.advance(&pool, &test_ensemble("RMSE", 0.5), features.view(), &mut additive, 0..3)
		.unwrap();
	let mut multiplicative = ApproxUpdater::Multiplicative.neutral_approx(1, 3);
	ApproxUpdater::Multiplicative
		.advance(&pool, &test_ensemble("Logloss", 0.5), features.view(), &mut multiplicative, 0..3)
		.unwrap();
	let raw = ApproxUpdater::Multiplicative.to_raw(multiplicative.view());
	for (a, b) in additive.iter().zip(raw.iter()) {
		assert!((a - b).abs() < 1e-12);
	}
	// -2 goes left in every tree. 0.5 goes right, left, right. 3 goes right in every tree.
	let expected = [(-1.0 + 0.5 + 0.2) * 0.5, (1.0 + 0.5 + 0.1) * 0.5, (1.0 - 0.25 + 0.1) * 0.5];
	for (a, b) in additive.iter().zip(expected.iter()) {
		assert!((a - b).abs() < 1e-12);
	}
}

#[test]
fn test_advance_rejects_out_of_range_trees() {
	let pool = WorkerPool::new(1).unwrap();
	let ensemble = test_ensemble("RMSE", 1.0);
	let features = arr2(&[[0.0f32]]);
	let mut approx = ApproxUpdater::Additive.neutral_approx(1, 1);
	let result = ApproxUpdater::Additive.advance(&pool, &ensemble, features.view(), &mut approx, 2..4);
	assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_multiplicative_saturates_outside_exp_range() {
	let pool = WorkerPool::new(1).unwrap();
	let mut deltas = arr2(&[[800.0, -800.0, 700.0]]);
	ApproxUpdater::Multiplicative.prepare_deltas(&mut deltas);
	let mut approx = ApproxUpdater::Multiplicative.neutral_approx(1, 3);
	ApproxUpdater::Multiplicative
		.update_approx(&pool, approx.view_mut(), deltas.view(), 1.0)
		.unwrap();
	let raw = ApproxUpdater::Multiplicative.to_raw(approx.view());
	assert_eq!(raw[[0, 0]], std::f64::INFINITY);
	assert_eq!(raw[[0, 1]], std::f64::NEG_INFINITY);
	assert!((raw[[0, 2]] - 700.0).abs() < 1e-9);
	// A saturated zero stays zero.
	let mut delta = arr2(&[[0.0, 5.0, 0.0]]);
	ApproxUpdater::Multiplicative.prepare_deltas(&mut delta);
	ApproxUpdater::Multiplicative
		.update_approx(&pool, approx.view_mut(), delta.view(), 1.0)
		.unwrap();
	assert_eq!(approx[[0, 1]], 0.0);
}
