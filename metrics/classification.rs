use super::{holder::weight_at, MetricError, MetricHolder, StreamingMetric};
use ndarray::prelude::*;
use num_traits::ToPrimitive;

/// `ln(1 + exp(x))`, computed without overflow for large `x`.
fn softplus(x: f64) -> f64 {
	if x > 0.0 {
		x + (-x).exp().ln_1p()
	} else {
		x.exp().ln_1p()
	}
}

/// The binary cross entropy of `sigmoid(approx)`, where a document is positive if its target is greater than `border`.
pub fn logloss_stats(
	approx: ArrayView1<f64>,
	target: &[f32],
	weights: Option<&[f32]>,
	border: f64,
) -> MetricHolder {
	MetricHolder::from_pointwise(approx, target, weights, |approx, target| {
		if target > border {
			softplus(-approx)
		} else {
			softplus(approx)
		}
	})
}

/// The cross entropy of `sigmoid(approx)` against a soft target in [0, 1].
pub fn cross_entropy_stats(
	approx: ArrayView1<f64>,
	target: &[f32],
	weights: Option<&[f32]>,
) -> MetricHolder {
	MetricHolder::from_pointwise(approx, target, weights, |approx, target| {
		target * softplus(-approx) + (1.0 - target) * softplus(approx)
	})
}

/**
The fraction of documents classified correctly. With a single approx dimension a document is predicted positive when its approx is greater than 0 and is positive when its target is greater than 0.5. With more dimensions the predicted class is the one with the largest approx.
*/
pub fn accuracy_stats(
	metric: &str,
	approx: ArrayView2<f64>,
	target: &[f32],
	weights: Option<&[f32]>,
) -> Result<MetricHolder, MetricError> {
	if approx.nrows() == 1 {
		return Ok(MetricHolder::from_pointwise(
			approx.row(0),
			target,
			weights,
			|approx, target| {
				if (approx > 0.0) == (target > 0.5) {
					1.0
				} else {
					0.0
				}
			},
		));
	}
	let mut holder = MetricHolder::default();
	for (index, column) in approx.axis_iter(Axis(1)).enumerate() {
		let class = class_index(metric, target[index], approx.nrows())?;
		let correct = if argmax(column) == class { 1.0 } else { 0.0 };
		holder.update((correct, weight_at(weights, index)));
	}
	Ok(holder)
}

/// The softmax cross entropy of the approx columns against the target classes.
pub fn multiclass_stats(
	metric: &str,
	approx: ArrayView2<f64>,
	target: &[f32],
	weights: Option<&[f32]>,
) -> Result<MetricHolder, MetricError> {
	let mut holder = MetricHolder::default();
	for (index, column) in approx.axis_iter(Axis(1)).enumerate() {
		let class = class_index(metric, target[index], approx.nrows())?;
		let max = column.iter().copied().fold(std::f64::NEG_INFINITY, f64::max);
		let log_sum_exp = max + column.iter().map(|value| (value - max).exp()).sum::<f64>().ln();
		holder.update((log_sum_exp - column[class], weight_at(weights, index)));
	}
	Ok(holder)
}

fn class_index(metric: &str, target: f32, n_classes: usize) -> Result<usize, MetricError> {
	let invalid = || MetricError::InvalidClass {
		metric: metric.to_owned(),
		target,
	};
	if target.fract() != 0.0 {
		return Err(invalid());
	}
	match target.to_usize() {
		Some(class) if class < n_classes => Ok(class),
		_ => Err(invalid()),
	}
}

fn argmax(values: ArrayView1<f64>) -> usize {
	let mut best = 0;
	for (index, value) in values.iter().enumerate() {
		if *value > values[best] {
			best = index;
		}
	}
	best
}

#[test]
fn test_logloss() {
	let approx = arr1(&[0.0, 0.0]);
	let stats = logloss_stats(approx.view(), &[1.0, 0.0], None, 0.5);
	assert!((stats.error - 2.0 * std::f64::consts::LN_2).abs() < 1e-12);
	// Large approx values do not overflow.
	let approx = arr1(&[1000.0]);
	let stats = logloss_stats(approx.view(), &[0.0], None, 0.5);
	assert!((stats.error - 1000.0).abs() < 1e-9);
}

#[test]
fn test_cross_entropy_matches_logloss_on_hard_targets() {
	let approx = arr1(&[-1.5, 0.3, 2.0]);
	let target = [0.0, 1.0, 1.0];
	let cross_entropy = cross_entropy_stats(approx.view(), &target, None);
	let logloss = logloss_stats(approx.view(), &target, None, 0.5);
	assert!((cross_entropy.error - logloss.error).abs() < 1e-12);
}

#[test]
fn test_accuracy() {
	let approx = arr2(&[[0.5, -0.5, 2.0]]);
	let stats = accuracy_stats("Accuracy", approx.view(), &[1.0, 1.0, 0.0], None).unwrap();
	assert_eq!(stats, MetricHolder::new(1.0, 3.0));
	let approx = arr2(&[[0.1, 0.9], [0.8, 0.05], [0.1, 0.05]]);
	let stats = accuracy_stats("Accuracy", approx.view(), &[1.0, 2.0], None).unwrap();
	assert_eq!(stats, MetricHolder::new(1.0, 2.0));
}

#[test]
fn test_multiclass() {
	let approx = arr2(&[[0.0], [0.0], [0.0]]);
	let stats = multiclass_stats("MultiClass", approx.view(), &[2.0], None).unwrap();
	assert!((stats.error - 3f64.ln()).abs() < 1e-12);
	assert_eq!(
		multiclass_stats("MultiClass", approx.view(), &[3.0], None),
		Err(MetricError::InvalidClass {
			metric: "MultiClass".to_owned(),
			target: 3.0,
		})
	);
	assert!(multiclass_stats("MultiClass", approx.view(), &[0.5], None).is_err());
}
