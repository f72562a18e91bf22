use super::{Ensemble, ModelError};
use std::{
	io::{BufReader, BufWriter},
	path::Path,
};

/// The serialization formats a model file can be in.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ModelFormat {
	#[serde(rename = "json")]
	Json,
	#[serde(rename = "msgpack")]
	MessagePack,
}

impl Default for ModelFormat {
	fn default() -> Self {
		ModelFormat::Json
	}
}

impl std::str::FromStr for ModelFormat {
	type Err = ModelError;
	fn from_str(value: &str) -> Result<ModelFormat, ModelError> {
		match value {
			"json" => Ok(ModelFormat::Json),
			"msgpack" => Ok(ModelFormat::MessagePack),
			_ => Err(ModelError::Invalid(format!(
				"unknown model format {:?}, expected \"json\" or \"msgpack\"",
				value
			))),
		}
	}
}

impl Ensemble {
	/// Read a model from `path` and validate it.
	pub fn from_path(path: &Path, format: ModelFormat) -> Result<Ensemble, ModelError> {
		let file = std::fs::File::open(path).map_err(|source| ModelError::Io {
			path: path.to_owned(),
			source,
		})?;
		let reader = BufReader::new(file);
		let ensemble: Ensemble = match format {
			ModelFormat::Json => serde_json::from_reader(reader)?,
			ModelFormat::MessagePack => rmp_serde::from_read(reader)?,
		};
		ensemble.validate()?;
		tracing::info!(
			path = %path.display(),
			n_trees = ensemble.n_trees(),
			approx_dimension = ensemble.approx_dimension,
			"loaded model"
		);
		Ok(ensemble)
	}

	pub fn to_path(&self, path: &Path, format: ModelFormat) -> Result<(), ModelError> {
		let file = std::fs::File::create(path).map_err(|source| ModelError::Io {
			path: path.to_owned(),
			source,
		})?;
		let mut writer = BufWriter::new(file);
		match format {
			ModelFormat::Json => serde_json::to_writer(&mut writer, self)?,
			ModelFormat::MessagePack => rmp_serde::encode::write_named(&mut writer, self)?,
		};
		std::io::Write::flush(&mut writer).map_err(|source| ModelError::Io {
			path: path.to_owned(),
			source,
		})?;
		Ok(())
	}
}

#[test]
fn test_load_json() {
	let json = r#"{
		"loss_function": "Logloss",
		"approx_dimension": 1,
		"features": [{ "type": "number" }],
		"trees": [{
			"nodes": [
				{
					"type": "branch",
					"left_child_index": 1,
					"right_child_index": 2,
					"split": { "type": "continuous", "feature_index": 0, "split_value": 0.5 }
				},
				{ "type": "leaf", "values": [-0.25] },
				{ "type": "leaf", "values": [0.75] }
			]
		}]
	}"#;
	let file = tempfile::NamedTempFile::new().unwrap();
	std::fs::write(file.path(), json).unwrap();
	let ensemble = Ensemble::from_path(file.path(), ModelFormat::Json).unwrap();
	assert_eq!(ensemble.n_trees(), 1);
	assert_eq!(ensemble.learning_rate, 1.0);
	assert!(ensemble.class_names.is_empty());
	match &ensemble.trees[0].nodes[0] {
		super::Node::Branch(super::BranchNode {
			split: super::BranchSplit::Continuous(split),
			..
		}) => assert_eq!(split.invalid_values_direction, super::SplitDirection::Left),
		_ => panic!("expected a continuous branch"),
	}
}

#[test]
fn test_msgpack_matches_json() {
	let ensemble = Ensemble {
		loss_function: "RMSE".to_owned(),
		approx_dimension: 1,
		learning_rate: 0.5,
		features: vec![gbeval_dataframe::ColumnType::Number],
		class_names: vec![],
		trees: vec![super::stump(0, 1.0, 2.0, 3.0)],
	};
	let dir = tempfile::tempdir().unwrap();
	let json_path = dir.path().join("model.json");
	let msgpack_path = dir.path().join("model.msgpack");
	ensemble.to_path(&json_path, ModelFormat::Json).unwrap();
	ensemble.to_path(&msgpack_path, ModelFormat::MessagePack).unwrap();
	let from_json = Ensemble::from_path(&json_path, ModelFormat::Json).unwrap();
	let from_msgpack = Ensemble::from_path(&msgpack_path, ModelFormat::MessagePack).unwrap();
	assert_eq!(from_json, ensemble);
	assert_eq!(from_msgpack, ensemble);
}

#[test]
fn test_load_rejects_invalid_model() {
	let json = r#"{ "loss_function": "RMSE", "approx_dimension": 2, "features": [], "trees": [{ "nodes": [{ "type": "leaf", "values": [1.0] }] }] }"#;
	let file = tempfile::NamedTempFile::new().unwrap();
	std::fs::write(file.path(), json).unwrap();
	assert!(matches!(
		Ensemble::from_path(file.path(), ModelFormat::Json),
		Err(ModelError::LeafDimension { .. })
	));
}
