/*!
This crate defines the metrics `gbeval` evaluates ensembles with. A [`MetricSet`](struct.MetricSet.html) is parsed from a comma separated description such as `"Logloss,AUC"`. Each [`Metric`](struct.Metric.html) in it is either additive, meaning its value over a dataset is a function of statistics summed over any partition of the dataset into blocks, or non-additive, meaning it needs every prediction at once.

The statistics of both kinds are accumulated in a [`MetricHolder`](struct.MetricHolder.html), which implements the [`StreamingMetric`](trait.StreamingMetric.html) trait.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod auc_roc;
mod classification;
mod description;
mod holder;
mod metric;
mod regression;
mod set;

pub use self::auc_roc::auc_roc_stats;
pub use self::description::MetricDescriptor;
pub use self::holder::MetricHolder;
pub use self::metric::{Metric, MetricInput, MetricKind};
pub use self::set::MetricSet;

use thiserror::Error;

/**
The `StreamingMetric` trait defines a common interface to metrics that can be computed in a streaming manner, where the input is available in chunks.

After being initialized, a value of type `T` implementing the `StreamingMetric` trait can have `update()` called on it with values of the associated type `Input`. Multiple values of `T` can be merged together by calling `merge()`. This is how the statistics of one block are combined with those of the blocks before it. When finished aggregating, call `finalize()` to produce the associated type `Output`.

The seemingly unused generic lifetime `'a` exists here to allow `Input`s and `Output`s to borrow from their enclosing scope.
*/
pub trait StreamingMetric<'a> {
	/// `Input` is the type to aggregate in calls to `update()`.
	type Input;
	/// `Output` is the return type of `finalize()`.
	type Output;
	/// Update this streaming metric with the `Input` `input`.
	fn update(&mut self, input: Self::Input);
	/// Merge multiple independently computed streaming metrics.
	fn merge(&mut self, other: Self);
	/// When you are done aggregating `Input`s, call `finalize()` to produce an `Output`.
	fn finalize(self) -> Self::Output;
}

#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
	#[error("no metric in metrics description {0:?}")]
	EmptyDescription(String),
	#[error("unknown metric {0:?}")]
	UnknownMetric(String),
	#[error("invalid metric description {0:?}")]
	InvalidDescription(String),
	#[error("metric {metric} has no parameter {parameter:?}")]
	UnknownParameter { metric: String, parameter: String },
	#[error("metric {metric} parameter {parameter} has an invalid value {value:?}")]
	InvalidParameter {
		metric: String,
		parameter: String,
		value: String,
	},
	#[error("metric {metric} cannot be used with an approx dimension of {approx_dimension}")]
	IncompatibleDimension {
		metric: String,
		approx_dimension: usize,
	},
	#[error("metric input {name} has {found} values, expected {expected}")]
	InputShape {
		name: &'static str,
		expected: usize,
		found: usize,
	},
	#[error("metric {0} requires query ids")]
	MissingQueryIds(String),
	#[error("metric {metric} got target {target}, which is not a class index")]
	InvalidClass { metric: String, target: f32 },
	#[error("metric {0} is not additive and cannot be computed block by block")]
	NotAdditive(String),
}
