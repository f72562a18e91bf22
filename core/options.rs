/*!
This module defines [`EvalMetricsOptions`](struct.EvalMetricsOptions.html), which configures a run of [`eval_metrics`](../fn.eval_metrics.html). Options can be read from a YAML or JSON config file. Fields that are omitted take their default values.
*/

use super::Error;
use gbeval_tree::ModelFormat;
use std::path::{Path, PathBuf};

/// A `tmp_dir` of `"-"` asks for a fresh temporary directory in the system location.
pub const FRESH_TMP_DIR: &str = "-";

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalMetricsOptions {
	pub model_path: PathBuf,
	#[serde(default)]
	pub model_format: ModelFormat,
	pub input_path: PathBuf,
	#[serde(default)]
	pub column_description_path: Option<PathBuf>,
	#[serde(default = "default_delimiter")]
	pub delimiter: char,
	#[serde(default)]
	pub has_header: bool,
	#[serde(default)]
	pub first_iteration: usize,
	/// The iteration to stop before. 0 means the number of trees in the model.
	#[serde(default)]
	pub end_iteration: usize,
	#[serde(default = "default_step")]
	pub step: usize,
	#[serde(default = "default_block_size")]
	pub block_size: usize,
	/// A comma separated metrics description, such as `"Logloss,AUC"`.
	pub metrics: String,
	#[serde(default = "default_result_dir")]
	pub result_dir: PathBuf,
	#[serde(default = "default_tmp_dir")]
	pub tmp_dir: String,
	/// Compute non-additive metrics in several passes over the dataset instead of holding it in memory.
	#[serde(default)]
	pub calc_on_parts: bool,
	/// The number of checkpoints each calc-on-parts pass handles.
	#[serde(default = "default_processed_iterations_step")]
	pub processed_iterations_step: usize,
	#[serde(default = "default_thread_count")]
	pub thread_count: usize,
	#[serde(default)]
	pub save_stats: bool,
}

fn default_delimiter() -> char {
	'\t'
}

fn default_step() -> usize {
	1
}

fn default_block_size() -> usize {
	150_000
}

fn default_result_dir() -> PathBuf {
	PathBuf::from(".")
}

fn default_tmp_dir() -> String {
	FRESH_TMP_DIR.to_owned()
}

fn default_processed_iterations_step() -> usize {
	50
}

fn default_thread_count() -> usize {
	std::thread::available_parallelism()
		.map(|n| n.get())
		.unwrap_or(1)
}

impl EvalMetricsOptions {
	/// Options with every optional field at its default.
	pub fn new(
		model_path: impl Into<PathBuf>,
		input_path: impl Into<PathBuf>,
		metrics: impl Into<String>,
	) -> EvalMetricsOptions {
		EvalMetricsOptions {
			model_path: model_path.into(),
			model_format: ModelFormat::default(),
			input_path: input_path.into(),
			column_description_path: None,
			delimiter: default_delimiter(),
			has_header: false,
			first_iteration: 0,
			end_iteration: 0,
			step: default_step(),
			block_size: default_block_size(),
			metrics: metrics.into(),
			result_dir: default_result_dir(),
			tmp_dir: default_tmp_dir(),
			calc_on_parts: false,
			processed_iterations_step: default_processed_iterations_step(),
			thread_count: default_thread_count(),
			save_stats: false,
		}
	}

	/// Read options from a YAML or JSON config file.
	pub fn from_path(path: &Path) -> Result<EvalMetricsOptions, Error> {
		let config = std::fs::read_to_string(path).map_err(|error| {
			Error::Configuration(format!(
				"failed to read config file {}: {}",
				path.display(),
				error
			))
		})?;
		let options = serde_yaml::from_str(&config)?;
		Ok(options)
	}

	/// The delimiter as a byte. Only single byte delimiters are supported.
	pub fn delimiter_byte(&self) -> Result<u8, Error> {
		if self.delimiter.is_ascii() {
			Ok(self.delimiter as u8)
		} else {
			Err(Error::Configuration(format!(
				"the delimiter {:?} is not a single byte character",
				self.delimiter
			)))
		}
	}

	/// The directory to create temporary storage in, or `None` for the system temporary directory.
	pub fn tmp_dir(&self) -> Option<&Path> {
		if self.tmp_dir == FRESH_TMP_DIR {
			None
		} else {
			Some(Path::new(&self.tmp_dir))
		}
	}
}

#[test]
fn test_defaults() {
	let options: EvalMetricsOptions = serde_yaml::from_str(
		"model_path: model.json\ninput_path: test.tsv\nmetrics: Logloss,AUC\n",
	)
	.unwrap();
	let expected = EvalMetricsOptions {
		thread_count: options.thread_count,
		..EvalMetricsOptions::new("model.json", "test.tsv", "Logloss,AUC")
	};
	assert_eq!(options, expected);
	assert_eq!(options.block_size, 150_000);
	assert_eq!(options.processed_iterations_step, 50);
	assert_eq!(options.tmp_dir(), None);
	assert_eq!(options.delimiter_byte().unwrap(), b'\t');
}

#[test]
fn test_json_config() {
	let options: EvalMetricsOptions = serde_yaml::from_str(
		r#"{"model_path": "m.msgpack", "model_format": "msgpack", "input_path": "d.csv", "delimiter": ",", "metrics": "RMSE", "calc_on_parts": true, "tmp_dir": "scratch"}"#,
	)
	.unwrap();
	assert_eq!(options.model_format, ModelFormat::MessagePack);
	assert_eq!(options.delimiter_byte().unwrap(), b',');
	assert!(options.calc_on_parts);
	assert_eq!(options.tmp_dir(), Some(Path::new("scratch")));
}

#[test]
fn test_unknown_field() {
	let result: Result<EvalMetricsOptions, _> =
		serde_yaml::from_str("model_path: a\ninput_path: b\nmetrics: RMSE\nblock: 10\n");
	assert!(result.is_err());
}
