use super::{
	auc_roc::auc_roc_stats, classification, regression, MetricDescriptor, MetricError,
	MetricHolder, StreamingMetric,
};
use ndarray::prelude::*;

/// The predictions and labels of a set of documents, as seen by a metric.
#[derive(Clone, Copy, Debug)]
pub struct MetricInput<'a> {
	/// (approx_dimension, n_documents) The raw approx of each document.
	pub approx: ArrayView2<'a, f64>,
	pub target: &'a [f32],
	pub weights: Option<&'a [f32]>,
	pub query_ids: Option<&'a [u64]>,
}

impl<'a> MetricInput<'a> {
	pub fn n_documents(&self) -> usize {
		self.approx.ncols()
	}

	fn check_shape(&self) -> Result<(), MetricError> {
		let expected = self.n_documents();
		let lengths = [
			("target", Some(self.target.len())),
			("weights", self.weights.map(|weights| weights.len())),
			("query_ids", self.query_ids.map(|query_ids| query_ids.len())),
		];
		for (name, found) in lengths.iter() {
			match found {
				Some(found) if *found != expected => {
					return Err(MetricError::InputShape {
						name: *name,
						expected,
						found: *found,
					})
				}
				_ => {}
			}
		}
		Ok(())
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetricKind {
	Rmse,
	Mae,
	Quantile { alpha: f64 },
	Logloss { border: f64 },
	CrossEntropy,
	Poisson,
	Accuracy,
	MultiClass,
	QueryRmse,
	Auc,
	NormalizedGini,
}

impl MetricKind {
	/// An additive metric's statistics over a dataset are the sum of its statistics over any partition of the dataset into blocks.
	pub fn is_additive(&self) -> bool {
		!matches!(self, MetricKind::Auc | MetricKind::NormalizedGini)
	}

	fn supports_approx_dimension(&self, approx_dimension: usize) -> bool {
		match self {
			MetricKind::Accuracy => true,
			MetricKind::MultiClass => approx_dimension > 1,
			_ => approx_dimension == 1,
		}
	}
}

/// A `Metric` is one configured entry of a [`MetricSet`](struct.MetricSet.html).
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
	description: String,
	kind: MetricKind,
	use_weights: bool,
}

impl Metric {
	/// Construct a metric from its descriptor, checking its parameters and that it can be evaluated on an approx with `approx_dimension` rows.
	pub fn from_descriptor(
		mut descriptor: MetricDescriptor,
		approx_dimension: usize,
	) -> Result<Metric, MetricError> {
		let description = descriptor.to_string();
		let name = descriptor.name.clone();
		let kind = match name.as_str() {
			"RMSE" => MetricKind::Rmse,
			"MAE" => MetricKind::Mae,
			"Quantile" => {
				let alpha = descriptor.take_param::<f64>("alpha")?.unwrap_or(0.5);
				if !(alpha > 0.0 && alpha < 1.0) {
					return Err(MetricError::InvalidParameter {
						metric: name.clone(),
						parameter: "alpha".to_owned(),
						value: alpha.to_string(),
					});
				}
				MetricKind::Quantile { alpha }
			}
			"Logloss" => {
				let border = descriptor.take_param::<f64>("border")?.unwrap_or(0.5);
				MetricKind::Logloss { border }
			}
			"CrossEntropy" => MetricKind::CrossEntropy,
			"Poisson" => MetricKind::Poisson,
			"Accuracy" => MetricKind::Accuracy,
			"MultiClass" => MetricKind::MultiClass,
			"QueryRMSE" => MetricKind::QueryRmse,
			"AUC" => MetricKind::Auc,
			"NormalizedGini" => MetricKind::NormalizedGini,
			_ => return Err(MetricError::UnknownMetric(name.clone())),
		};
		let use_weights = descriptor.take_param::<bool>("use_weights")?.unwrap_or(true);
		descriptor.ensure_no_params_left()?;
		if !kind.supports_approx_dimension(approx_dimension) {
			return Err(MetricError::IncompatibleDimension {
				metric: name,
				approx_dimension,
			});
		}
		Ok(Metric {
			description,
			kind,
			use_weights,
		})
	}

	/// The metric as it was described, which is also its column name in the results.
	pub fn description(&self) -> &str {
		&self.description
	}

	pub fn kind(&self) -> &MetricKind {
		&self.kind
	}

	pub fn is_additive(&self) -> bool {
		self.kind.is_additive()
	}

	/// Compute the statistics of an additive metric on one block. Merging the statistics of every block gives the statistics of the whole dataset.
	pub fn eval_block(&self, input: &MetricInput) -> Result<MetricHolder, MetricError> {
		if !self.is_additive() {
			return Err(MetricError::NotAdditive(self.description.clone()));
		}
		self.compute(input)
	}

	/// Compute the statistics of any metric on the entire dataset at once.
	pub fn compute(&self, input: &MetricInput) -> Result<MetricHolder, MetricError> {
		input.check_shape()?;
		let approx = input.approx;
		let target = input.target;
		let weights = if self.use_weights {
			input.weights
		} else {
			None
		};
		let holder = match &self.kind {
			MetricKind::Rmse => regression::squared_error_stats(approx.row(0), target, weights),
			MetricKind::Mae => regression::absolute_error_stats(approx.row(0), target, weights),
			MetricKind::Quantile { alpha } => {
				regression::quantile_stats(approx.row(0), target, weights, *alpha)
			}
			MetricKind::Poisson => regression::poisson_stats(approx.row(0), target, weights),
			MetricKind::QueryRmse => {
				let query_ids = input
					.query_ids
					.ok_or_else(|| MetricError::MissingQueryIds(self.description.clone()))?;
				regression::query_squared_error_stats(approx.row(0), target, weights, query_ids)
			}
			MetricKind::Logloss { border } => {
				classification::logloss_stats(approx.row(0), target, weights, *border)
			}
			MetricKind::CrossEntropy => {
				classification::cross_entropy_stats(approx.row(0), target, weights)
			}
			MetricKind::Accuracy => {
				classification::accuracy_stats(&self.description, approx, target, weights)?
			}
			MetricKind::MultiClass => {
				classification::multiclass_stats(&self.description, approx, target, weights)?
			}
			MetricKind::Auc | MetricKind::NormalizedGini => {
				let labels: Vec<bool> = target.iter().map(|target| *target > 0.5).collect();
				let predictions = approx.row(0).to_vec();
				auc_roc_stats(&predictions, &labels, weights)
			}
		};
		Ok(holder)
	}

	/**
	Turn accumulated statistics into the metric's value. A dataset with no weight has an error of 0. An AUC with no (positive, negative) pair is 0.5, the value of a random ranking, so the normalized Gini is 0.
	*/
	pub fn finalize(&self, holder: MetricHolder) -> f64 {
		let mean = |default: f64| holder.finalize().unwrap_or(default);
		match self.kind {
			MetricKind::Rmse | MetricKind::QueryRmse => mean(0.0).sqrt(),
			MetricKind::Auc => mean(0.5),
			MetricKind::NormalizedGini => 2.0 * mean(0.5) - 1.0,
			_ => mean(0.0),
		}
	}
}

#[cfg(test)]
fn metric(description: &str, approx_dimension: usize) -> Result<Metric, MetricError> {
	Metric::from_descriptor(description.parse()?, approx_dimension)
}

#[test]
fn test_rmse() {
	let metric = metric("RMSE", 1).unwrap();
	let approx = arr2(&[[1.0, 2.0, 3.0]]);
	let input = MetricInput {
		approx: approx.view(),
		target: &[1.0, 1.0, 1.0],
		weights: None,
		query_ids: None,
	};
	let holder = metric.eval_block(&input).unwrap();
	assert!((metric.finalize(holder) - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
}

#[test]
fn test_use_weights() {
	let approx = arr2(&[[0.0, 0.0]]);
	let input = MetricInput {
		approx: approx.view(),
		target: &[1.0, 3.0],
		weights: Some(&[3.0, 1.0]),
		query_ids: None,
	};
	let weighted = metric("MAE", 1).unwrap();
	let holder = weighted.eval_block(&input).unwrap();
	assert_eq!(weighted.finalize(holder), 1.5);
	let unweighted = metric("MAE:use_weights=false", 1).unwrap();
	let holder = unweighted.eval_block(&input).unwrap();
	assert_eq!(unweighted.finalize(holder), 2.0);
	assert_eq!(unweighted.description(), "MAE:use_weights=false");
}

#[test]
fn test_parameters_and_dimensions() {
	assert_eq!(
		metric("Quantile:alpha=0.3", 1).unwrap().kind(),
		&MetricKind::Quantile { alpha: 0.3 }
	);
	assert_eq!(
		metric("Quantile", 1).unwrap().kind(),
		&MetricKind::Quantile { alpha: 0.5 }
	);
	assert!(matches!(
		metric("Quantile:alpha=2", 1),
		Err(MetricError::InvalidParameter { .. })
	));
	assert!(matches!(
		metric("RMSE:border=1", 1),
		Err(MetricError::UnknownParameter { .. })
	));
	assert!(matches!(
		metric("Rmse", 1),
		Err(MetricError::UnknownMetric(_))
	));
	assert!(matches!(
		metric("MultiClass", 1),
		Err(MetricError::IncompatibleDimension { .. })
	));
	assert!(matches!(
		metric("Logloss", 3),
		Err(MetricError::IncompatibleDimension { .. })
	));
	assert!(metric("Accuracy", 3).is_ok());
	assert!(metric("Accuracy", 1).is_ok());
}

#[test]
fn test_auc_is_not_additive() {
	let auc = metric("AUC", 1).unwrap();
	assert!(!auc.is_additive());
	let approx = arr2(&[[0.9, 0.4, 0.4, 0.2]]);
	let input = MetricInput {
		approx: approx.view(),
		target: &[1.0, 1.0, 0.0, 0.0],
		weights: None,
		query_ids: None,
	};
	assert_eq!(
		auc.eval_block(&input),
		Err(MetricError::NotAdditive("AUC".to_owned()))
	);
	let holder = auc.compute(&input).unwrap();
	assert_eq!(auc.finalize(holder), 0.875);
	let gini = metric("NormalizedGini", 1).unwrap();
	assert_eq!(gini.finalize(gini.compute(&input).unwrap()), 0.75);
}

#[test]
fn test_degenerate_values() {
	let empty = MetricHolder::default();
	assert_eq!(metric("AUC", 1).unwrap().finalize(empty), 0.5);
	assert_eq!(metric("NormalizedGini", 1).unwrap().finalize(empty), 0.0);
	assert_eq!(metric("RMSE", 1).unwrap().finalize(empty), 0.0);
	assert_eq!(metric("Logloss", 1).unwrap().finalize(empty), 0.0);
}

#[test]
fn test_input_shape_and_query_ids() {
	let approx = arr2(&[[0.0, 0.0, 5.0]]);
	let input = MetricInput {
		approx: approx.view(),
		target: &[1.0, 3.0, 1.0],
		weights: None,
		query_ids: Some(&[7, 7, 8]),
	};
	let query_rmse = metric("QueryRMSE", 1).unwrap();
	let holder = query_rmse.eval_block(&input).unwrap();
	assert!((query_rmse.finalize(holder) - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
	let input = MetricInput {
		query_ids: None,
		..input
	};
	assert!(matches!(
		query_rmse.eval_block(&input),
		Err(MetricError::MissingQueryIds(_))
	));
	let input = MetricInput {
		target: &[1.0],
		..input
	};
	assert_eq!(
		metric("RMSE", 1).unwrap().eval_block(&input),
		Err(MetricError::InputShape {
			name: "target",
			expected: 3,
			found: 1,
		})
	);
}
