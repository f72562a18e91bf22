use super::{Metric, MetricDescriptor, MetricError};

/// A `MetricSet` is the ordered list of metrics a run evaluates. The order is the order of the description and of the result columns.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSet {
	metrics: Vec<Metric>,
}

// `from_description` rejects empty lists, so a `MetricSet` is never empty.
#[allow(clippy::len_without_is_empty)]
impl MetricSet {
	/**
	Parse a comma separated metrics description such as `"Logloss,AUC"` or `"Quantile:alpha=0.3,RMSE"`. Every metric must support an approx with `approx_dimension` rows.
	*/
	pub fn from_description(
		description: &str,
		approx_dimension: usize,
	) -> Result<MetricSet, MetricError> {
		let descriptors = MetricDescriptor::parse_list(description)?;
		if descriptors.is_empty() {
			return Err(MetricError::EmptyDescription(description.to_owned()));
		}
		let metrics = descriptors
			.into_iter()
			.map(|descriptor| Metric::from_descriptor(descriptor, approx_dimension))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(MetricSet { metrics })
	}

	pub fn len(&self) -> usize {
		self.metrics.len()
	}

	pub fn iter(&self) -> std::slice::Iter<Metric> {
		self.metrics.iter()
	}

	pub fn has_additive(&self) -> bool {
		self.metrics.iter().any(|metric| metric.is_additive())
	}

	pub fn has_non_additive(&self) -> bool {
		self.metrics.iter().any(|metric| !metric.is_additive())
	}
}

impl<'a> IntoIterator for &'a MetricSet {
	type Item = &'a Metric;
	type IntoIter = std::slice::Iter<'a, Metric>;
	fn into_iter(self) -> Self::IntoIter {
		self.metrics.iter()
	}
}

#[test]
fn test_from_description() {
	let metrics = MetricSet::from_description("Logloss,AUC", 1).unwrap();
	assert_eq!(metrics.len(), 2);
	let additive: Vec<bool> = metrics.iter().map(|metric| metric.is_additive()).collect();
	assert_eq!(additive, vec![true, false]);
	assert!(metrics.has_additive());
	assert!(metrics.has_non_additive());
	let descriptions: Vec<&str> = metrics.iter().map(|metric| metric.description()).collect();
	insta::assert_debug_snapshot!(descriptions, @r###"
[
    "Logloss",
    "AUC",
]
"###);
}

#[test]
fn test_empty_description() {
	assert_eq!(
		MetricSet::from_description("", 1),
		Err(MetricError::EmptyDescription("".to_owned()))
	);
	assert_eq!(
		MetricSet::from_description(" , ,", 1),
		Err(MetricError::EmptyDescription(" , ,".to_owned()))
	);
}

#[test]
fn test_unknown_metric() {
	assert_eq!(
		MetricSet::from_description("RMSE,Foo", 1),
		Err(MetricError::UnknownMetric("Foo".to_owned()))
	);
	let metrics = MetricSet::from_description("RMSE", 1).unwrap();
	assert!(!metrics.has_non_additive());
}
