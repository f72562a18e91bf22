use gbeval_dataframe::DatasetError;
use gbeval_metrics::MetricError;
use gbeval_tree::ModelError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	/// The options, the metrics description, or the model and column description do not fit together.
	#[error("configuration error: {0}")]
	Configuration(String),
	/// The data does not have the shape the model or a metric expects.
	#[error("data shape error: {0}")]
	DataShape(String),
	/// Temporary storage could not be created, written, or read.
	#[error("temporary storage error at {}: {source}", path.display())]
	Resource {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("{operation} cannot be called when the calcer is {state}")]
	InvalidState {
		operation: &'static str,
		state: &'static str,
	},
	#[error(transparent)]
	Model(ModelError),
	#[error(transparent)]
	Dataset(DatasetError),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("failed to write results: {0}")]
	Csv(#[from] csv::Error),
	#[error("failed to parse the config: {0}")]
	Yaml(#[from] serde_yaml::Error),
	#[error("failed to encode or decode a snapshot: {0}")]
	Bincode(#[from] bincode::Error),
}

impl From<ModelError> for Error {
	fn from(error: ModelError) -> Error {
		match error {
			ModelError::MissingColumnDescription | ModelError::FeatureTypeMismatch { .. } => {
				Error::Configuration(error.to_string())
			}
			error => Error::Model(error),
		}
	}
}

impl From<DatasetError> for Error {
	fn from(error: DatasetError) -> Error {
		if error.is_data_shape() {
			return Error::DataShape(error.to_string());
		}
		match error {
			DatasetError::ColumnDescription { .. }
			| DatasetError::MissingLabel
			| DatasetError::ZeroBlockSize => Error::Configuration(error.to_string()),
			error => Error::Dataset(error),
		}
	}
}

impl From<MetricError> for Error {
	fn from(error: MetricError) -> Error {
		match error {
			MetricError::InputShape { .. }
			| MetricError::MissingQueryIds(_)
			| MetricError::InvalidClass { .. } => Error::DataShape(error.to_string()),
			error => Error::Configuration(error.to_string()),
		}
	}
}

impl Error {
	pub fn is_configuration(&self) -> bool {
		matches!(self, Error::Configuration(_))
	}

	pub fn is_data_shape(&self) -> bool {
		matches!(self, Error::DataShape(_))
	}
}

#[test]
fn test_conversions() {
	let error: Error = MetricError::EmptyDescription(String::new()).into();
	assert!(error.is_configuration());
	let error: Error = MetricError::InvalidClass {
		metric: "MultiClass".to_owned(),
		target: 7.0,
	}
	.into();
	assert!(error.is_data_shape());
	let error: Error = ModelError::MissingColumnDescription.into();
	assert!(error.is_configuration());
	let error: Error = DatasetError::RowShape {
		row: 3,
		expected: 4,
		found: 2,
	}
	.into();
	insta::assert_display_snapshot!(error, @"data shape error: row 3 has 2 columns, expected 4");
}
