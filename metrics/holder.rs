use super::StreamingMetric;
use ndarray::prelude::*;

/**
A `MetricHolder` holds the sufficient statistics of a metric: a weighted error sum and the total weight. For additive metrics the holders of separate blocks are merged by summing both fields.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricHolder {
	pub error: f64,
	pub weight: f64,
}

impl MetricHolder {
	pub fn new(error: f64, weight: f64) -> MetricHolder {
		MetricHolder { error, weight }
	}

	/// Accumulate a per-document loss over a block. Documents without a weight count once.
	pub(crate) fn from_pointwise(
		approx: ArrayView1<f64>,
		target: &[f32],
		weights: Option<&[f32]>,
		loss: impl Fn(f64, f64) -> f64,
	) -> MetricHolder {
		let mut holder = MetricHolder::default();
		for (index, (approx, target)) in approx.iter().zip(target.iter()).enumerate() {
			let error = loss(*approx, f64::from(*target));
			holder.update((error, weight_at(weights, index)));
		}
		holder
	}
}

pub(crate) fn weight_at(weights: Option<&[f32]>, index: usize) -> f64 {
	weights
		.map(|weights| f64::from(weights[index]))
		.unwrap_or(1.0)
}

impl StreamingMetric<'_> for MetricHolder {
	/// (error, weight)
	type Input = (f64, f64);
	/// The weighted mean error, or `None` if no weight was accumulated.
	type Output = Option<f64>;

	fn update(&mut self, (error, weight): Self::Input) {
		self.error += error * weight;
		self.weight += weight;
	}

	fn merge(&mut self, other: Self) {
		self.error += other.error;
		self.weight += other.weight;
	}

	fn finalize(self) -> Self::Output {
		if self.weight > 0.0 {
			Some(self.error / self.weight)
		} else {
			None
		}
	}
}

#[test]
fn test_holder() {
	let mut a = MetricHolder::default();
	a.update((1.0, 1.0));
	a.update((3.0, 2.0));
	let mut b = MetricHolder::default();
	b.update((5.0, 1.0));
	a.merge(b);
	assert_eq!(a, MetricHolder::new(12.0, 4.0));
	assert_eq!(a.finalize(), Some(3.0));
	assert_eq!(MetricHolder::default().finalize(), None);
}

#[test]
fn test_from_pointwise() {
	let approx = arr1(&[1.0, 2.0, 4.0]);
	let holder = MetricHolder::from_pointwise(approx.view(), &[1.0, 1.0, 1.0], Some(&[1.0, 2.0, 0.5]), |a, t| a - t);
	assert_eq!(holder, MetricHolder::new(3.5, 3.5));
}
