use super::MetricHolder;
use itertools::Itertools;

/**
This function computes the statistics of the area under the receiver operating characteristic curve. The area is the weighted fraction of (positive, negative) pairs that the predictions order correctly, with tied predictions counting one half, which equals the trapezoid rule over the ROC curve.

The returned holder's `error` is the weight of correctly ordered pairs and its `weight` is the weight of all pairs, so `error / weight` is the AUC.
*/
pub fn auc_roc_stats(predictions: &[f64], labels: &[bool], weights: Option<&[f32]>) -> MetricHolder {
	let mut examples: Vec<(f64, bool, f64)> = predictions
		.iter()
		.zip(labels.iter())
		.enumerate()
		.map(|(index, (prediction, label))| {
			let weight = weights.map(|weights| f64::from(weights[index])).unwrap_or(1.0);
			(*prediction, *label, weight)
		})
		.collect();
	// Sort by prediction, highest first. NaN predictions sort last.
	examples.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or_else(|| a.0.is_nan().cmp(&b.0.is_nan())));
	let mut correct_pairs = 0.0;
	let mut positive_weight_above = 0.0;
	let mut negative_weight = 0.0;
	// Each group of equal predictions is a single point on the ROC curve.
	for (_, group) in &examples.iter().group_by(|(prediction, _, _)| TieKey(*prediction)) {
		let (group_positive_weight, group_negative_weight) =
			group.fold((0.0, 0.0), |(positive, negative), (_, label, weight)| {
				if *label {
					(positive + weight, negative)
				} else {
					(positive, negative + weight)
				}
			});
		correct_pairs +=
			group_negative_weight * (positive_weight_above + 0.5 * group_positive_weight);
		positive_weight_above += group_positive_weight;
		negative_weight += group_negative_weight;
	}
	MetricHolder::new(correct_pairs, positive_weight_above * negative_weight)
}

/// Predictions are tied if they are equal or both NaN.
struct TieKey(f64);

impl PartialEq for TieKey {
	fn eq(&self, other: &TieKey) -> bool {
		self.0 == other.0 || (self.0.is_nan() && other.0.is_nan())
	}
}

#[test]
fn test_auc_roc() {
	let labels = vec![true, true, false, false];
	let predictions = vec![0.9, 0.4, 0.4, 0.2];
	let stats = auc_roc_stats(&predictions, &labels, None);
	assert!(f64::abs(stats.error / stats.weight - 0.875) < std::f64::EPSILON);
}

#[test]
fn test_auc_roc_perfect_and_reversed() {
	let labels = vec![false, true, true];
	let stats = auc_roc_stats(&[0.1, 0.5, 0.9], &labels, None);
	assert_eq!(stats, MetricHolder::new(2.0, 2.0));
	let stats = auc_roc_stats(&[0.9, 0.5, 0.1], &labels, None);
	assert_eq!(stats, MetricHolder::new(0.0, 2.0));
	let stats = auc_roc_stats(&[0.0, 0.0, 0.0], &labels, None);
	assert_eq!(stats, MetricHolder::new(1.0, 2.0));
}

#[test]
fn test_auc_roc_weighted() {
	let labels = vec![true, false, false];
	// The heavy negative is ranked above the positive.
	let stats = auc_roc_stats(&[0.5, 0.9, 0.1], &labels, Some(&[1.0, 3.0, 1.0]));
	assert_eq!(stats, MetricHolder::new(1.0, 4.0));
}
