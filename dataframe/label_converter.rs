use super::DatasetError;
use fnv::FnvHashMap;

/**
A `LabelConverter` maps the class labels found in a dataset to the dense class indexes a classification model predicts. It is built from the model's class names. A converter built from an empty list is not initialized, and labels are then parsed as numbers.

Compression depends only on the class names, so every pass over a dataset sees exactly the same targets.
*/
#[derive(Clone, Debug, Default)]
pub struct LabelConverter {
	class_names: Vec<String>,
	class_indexes: FnvHashMap<String, usize>,
}

impl LabelConverter {
	pub fn new(class_names: &[String]) -> LabelConverter {
		let class_indexes = class_names
			.iter()
			.enumerate()
			.map(|(index, name)| (name.clone(), index))
			.collect();
		LabelConverter {
			class_names: class_names.to_owned(),
			class_indexes,
		}
	}

	pub fn is_initialized(&self) -> bool {
		!self.class_names.is_empty()
	}

	/// Convert raw labels to targets.
	pub fn compress<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<f32>, DatasetError> {
		labels
			.iter()
			.map(|label| {
				let label = label.as_ref();
				if self.is_initialized() {
					self.class_index(label)
						.map(|index| index as f32)
						.ok_or_else(|| DatasetError::UnknownLabel {
							label: label.to_owned(),
						})
				} else {
					parse_number(label).ok_or_else(|| DatasetError::InvalidLabel {
						label: label.to_owned(),
					})
				}
			})
			.collect()
	}

	fn class_index(&self, label: &str) -> Option<usize> {
		if let Some(index) = self.class_indexes.get(label.trim()) {
			return Some(*index);
		}
		// "1.0" in the data should match a class named "1".
		let value = parse_number(label)?;
		self.class_names
			.iter()
			.position(|name| parse_number(name) == Some(value))
	}
}

fn parse_number(value: &str) -> Option<f32> {
	match lexical::parse::<f32, _>(value.trim()) {
		Ok(value) if value.is_finite() => Some(value),
		_ => None,
	}
}

#[test]
fn test_compress_class_names() {
	let converter = LabelConverter::new(&["cat".to_owned(), "dog".to_owned(), "7".to_owned()]);
	assert!(converter.is_initialized());
	assert_eq!(
		converter.compress(&["dog", "cat", "7.0", "7"]).unwrap(),
		vec![1.0, 0.0, 2.0, 2.0]
	);
	assert!(matches!(
		converter.compress(&["bird"]),
		Err(DatasetError::UnknownLabel { .. })
	));
}

#[test]
fn test_compress_is_pass_independent() {
	let converter = LabelConverter::new(&["b".to_owned(), "a".to_owned()]);
	let first = converter.compress(&["a", "b", "a"]).unwrap();
	let second = converter.compress(&["a", "b", "a"]).unwrap();
	assert_eq!(first, second);
}

#[test]
fn test_uninitialized_parses_numbers() {
	let converter = LabelConverter::new(&[]);
	assert!(!converter.is_initialized());
	assert_eq!(converter.compress(&["0.5", " 2"]).unwrap(), vec![0.5, 2.0]);
	assert!(converter.compress(&["yes"]).is_err());
}
