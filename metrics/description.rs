use super::MetricError;
use std::collections::BTreeMap;

/// A `MetricDescriptor` is the parsed form of one entry in a metrics description, such as `Quantile:alpha=0.3;use_weights=false`.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricDescriptor {
	pub name: String,
	pub params: BTreeMap<String, String>,
}

impl MetricDescriptor {
	/// Split a comma separated metrics description into descriptors. Empty entries are skipped.
	pub fn parse_list(description: &str) -> Result<Vec<MetricDescriptor>, MetricError> {
		description
			.split(',')
			.map(str::trim)
			.filter(|entry| !entry.is_empty())
			.map(|entry| entry.parse::<MetricDescriptor>())
			.collect()
	}

	/// Remove and return the parameter `key`, parsed as `T`.
	pub fn take_param<T: std::str::FromStr>(&mut self, key: &str) -> Result<Option<T>, MetricError> {
		match self.params.remove(key) {
			None => Ok(None),
			Some(value) => value
				.parse()
				.map(Some)
				.map_err(|_| MetricError::InvalidParameter {
					metric: self.name.clone(),
					parameter: key.to_owned(),
					value,
				}),
		}
	}

	/// Fail if any parameter was not taken.
	pub fn ensure_no_params_left(&self) -> Result<(), MetricError> {
		match self.params.keys().next() {
			Some(parameter) => Err(MetricError::UnknownParameter {
				metric: self.name.clone(),
				parameter: parameter.clone(),
			}),
			None => Ok(()),
		}
	}
}

impl std::str::FromStr for MetricDescriptor {
	type Err = MetricError;

	fn from_str(entry: &str) -> Result<MetricDescriptor, MetricError> {
		let invalid = || MetricError::InvalidDescription(entry.to_owned());
		let (name, params) = match entry.find(':') {
			Some(position) => (&entry[..position], Some(&entry[position + 1..])),
			None => (entry, None),
		};
		let name = name.trim();
		if name.is_empty() {
			return Err(invalid());
		}
		let mut descriptor = MetricDescriptor {
			name: name.to_owned(),
			params: BTreeMap::new(),
		};
		for param in params
			.into_iter()
			.flat_map(|params| params.split(';'))
			.map(str::trim)
			.filter(|param| !param.is_empty())
		{
			let mut parts = param.splitn(2, '=');
			let key = parts.next().map(str::trim).unwrap_or_default();
			let value = parts.next().map(str::trim).ok_or_else(invalid)?;
			if key.is_empty() {
				return Err(invalid());
			}
			if descriptor
				.params
				.insert(key.to_owned(), value.to_owned())
				.is_some()
			{
				return Err(invalid());
			}
		}
		Ok(descriptor)
	}
}

impl std::fmt::Display for MetricDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name)?;
		for (index, (key, value)) in self.params.iter().enumerate() {
			let separator = if index == 0 { ':' } else { ';' };
			write!(f, "{}{}={}", separator, key, value)?;
		}
		Ok(())
	}
}

#[test]
fn test_parse_list() {
	let descriptors = MetricDescriptor::parse_list("Logloss, ,Quantile:alpha=0.3;use_weights=false,").unwrap();
	insta::assert_debug_snapshot!(descriptors, @r###"
[
    MetricDescriptor {
        name: "Logloss",
        params: {},
    },
    MetricDescriptor {
        name: "Quantile",
        params: {
            "alpha": "0.3",
            "use_weights": "false",
        },
    },
]
"###);
	assert_eq!(
		descriptors[1].to_string(),
		"Quantile:alpha=0.3;use_weights=false"
	);
}

#[test]
fn test_take_param() {
	let mut descriptor: MetricDescriptor = "Quantile:alpha=0.3;beta=1".parse().unwrap();
	assert_eq!(descriptor.take_param::<f64>("alpha").unwrap(), Some(0.3));
	assert_eq!(descriptor.take_param::<f64>("alpha").unwrap(), None);
	assert_eq!(
		descriptor.ensure_no_params_left(),
		Err(MetricError::UnknownParameter {
			metric: "Quantile".to_owned(),
			parameter: "beta".to_owned(),
		})
	);
	let mut descriptor: MetricDescriptor = "Quantile:alpha=x;use_weights=true".parse().unwrap();
	assert_eq!(
		descriptor.params,
		maplit::btreemap! {
			"alpha".to_owned() => "x".to_owned(),
			"use_weights".to_owned() => "true".to_owned(),
		}
	);
	assert!(descriptor.take_param::<f64>("alpha").is_err());
	assert_eq!(descriptor.take_param::<bool>("use_weights").unwrap(), Some(true));
}

#[test]
fn test_invalid_descriptions() {
	assert!(":alpha=1".parse::<MetricDescriptor>().is_err());
	assert!("Quantile:alpha".parse::<MetricDescriptor>().is_err());
	assert!("Quantile:alpha=1;alpha=2".parse::<MetricDescriptor>().is_err());
}
