use super::{holder::weight_at, MetricHolder, StreamingMetric};
use ndarray::prelude::*;

/// The sum of squared errors. Its square root after finalizing is the RMSE.
pub fn squared_error_stats(
	approx: ArrayView1<f64>,
	target: &[f32],
	weights: Option<&[f32]>,
) -> MetricHolder {
	MetricHolder::from_pointwise(approx, target, weights, |approx, target| {
		(approx - target).powi(2)
	})
}

pub fn absolute_error_stats(
	approx: ArrayView1<f64>,
	target: &[f32],
	weights: Option<&[f32]>,
) -> MetricHolder {
	MetricHolder::from_pointwise(approx, target, weights, |approx, target| {
		(approx - target).abs()
	})
}

/// The pinball loss: underestimates cost `alpha` per unit and overestimates cost `1 - alpha` per unit.
pub fn quantile_stats(
	approx: ArrayView1<f64>,
	target: &[f32],
	weights: Option<&[f32]>,
	alpha: f64,
) -> MetricHolder {
	MetricHolder::from_pointwise(approx, target, weights, |approx, target| {
		let residual = target - approx;
		if residual > 0.0 {
			alpha * residual
		} else {
			(alpha - 1.0) * residual
		}
	})
}

/// The Poisson negative log likelihood up to a constant, with the approx being the log of the rate.
pub fn poisson_stats(
	approx: ArrayView1<f64>,
	target: &[f32],
	weights: Option<&[f32]>,
) -> MetricHolder {
	MetricHolder::from_pointwise(approx, target, weights, |approx, target| {
		approx.exp() - target * approx
	})
}

/**
The squared error after removing each query's weighted mean residual, so that only the ordering of documents within a query matters. Queries are runs of consecutive documents with equal query ids, which never cross a block boundary, so the statistics of separate blocks can be summed.
*/
pub fn query_squared_error_stats(
	approx: ArrayView1<f64>,
	target: &[f32],
	weights: Option<&[f32]>,
	query_ids: &[u64],
) -> MetricHolder {
	let mut holder = MetricHolder::default();
	let mut query_start = 0;
	while query_start < query_ids.len() {
		let query_id = query_ids[query_start];
		let query_end = query_ids[query_start..]
			.iter()
			.position(|id| *id != query_id)
			.map(|length| query_start + length)
			.unwrap_or_else(|| query_ids.len());
		let mut residual_sum = 0.0;
		let mut weight_sum = 0.0;
		for index in query_start..query_end {
			let weight = weight_at(weights, index);
			residual_sum += weight * (f64::from(target[index]) - approx[index]);
			weight_sum += weight;
		}
		let mean_residual = if weight_sum > 0.0 {
			residual_sum / weight_sum
		} else {
			0.0
		};
		for index in query_start..query_end {
			let residual = f64::from(target[index]) - approx[index] - mean_residual;
			holder.update((residual * residual, weight_at(weights, index)));
		}
		query_start = query_end;
	}
	holder
}

#[test]
fn test_squared_and_absolute_error() {
	let approx = arr1(&[1.0, 2.0, 3.0]);
	let target = [1.0, 1.0, 1.0];
	assert_eq!(
		squared_error_stats(approx.view(), &target, None),
		MetricHolder::new(5.0, 3.0)
	);
	assert_eq!(
		absolute_error_stats(approx.view(), &target, Some(&[1.0, 1.0, 2.0])),
		MetricHolder::new(5.0, 4.0)
	);
}

#[test]
fn test_quantile() {
	let approx = arr1(&[0.0, 0.0]);
	let stats = quantile_stats(approx.view(), &[2.0, -2.0], None, 0.25);
	assert_eq!(stats, MetricHolder::new(0.5 + 1.5, 2.0));
}

#[test]
fn test_poisson() {
	let approx = arr1(&[0.0]);
	assert_eq!(
		poisson_stats(approx.view(), &[3.0], None),
		MetricHolder::new(1.0, 1.0)
	);
}

#[test]
fn test_query_squared_error() {
	// The first query's residuals are 1 and 3 around a mean of 2. The second query has a single document, which always matches its own mean.
	let approx = arr1(&[0.0, 0.0, 5.0]);
	let stats = query_squared_error_stats(approx.view(), &[1.0, 3.0, 1.0], None, &[7, 7, 8]);
	assert_eq!(stats, MetricHolder::new(2.0, 3.0));
}
