/*!
This crate reads evaluation datasets. A dataset is a delimited text file whose columns are described by a [`ColumnDescription`](struct.ColumnDescription.html). It is never loaded whole: [`for_each_block`](fn.for_each_block.html) streams it as a sequence of [`DataBlock`](struct.DataBlock.html)s of bounded size, so the same dataset can be passed over as many times as the caller needs.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod block;
mod column_description;
mod label_converter;
mod stream;

pub use self::block::DataBlock;
pub use self::column_description::{ColumnDescription, ColumnLayout, ColumnRole};
pub use self::label_converter::LabelConverter;
pub use self::stream::{for_each_block, DatasetSource};

use std::path::PathBuf;
use thiserror::Error;

/// The type of a model feature, which determines how its column in the dataset is parsed.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ColumnType {
	/// Values are parsed as `f32`. Missing or unparseable values become NaN.
	#[serde(rename = "number")]
	Number,
	/// Values are looked up in `options` and stored as the 1-based option index. Values not in `options` are stored as 0.
	#[serde(rename = "enum")]
	Enum { options: Vec<String> },
}

impl ColumnType {
	pub fn is_enum(&self) -> bool {
		matches!(self, ColumnType::Enum { .. })
	}
}

#[derive(Debug, Error)]
pub enum DatasetError {
	#[error("failed to open {}: {source}", path.display())]
	Open {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to read the dataset: {0}")]
	Csv(#[from] csv::Error),
	#[error("column description line {line}: {message}")]
	ColumnDescription { line: usize, message: String },
	#[error("the dataset has no label column")]
	MissingLabel,
	#[error("the block size must be positive")]
	ZeroBlockSize,
	#[error("the model has {expected} features but the dataset only has {found} feature columns")]
	MissingFeatures { expected: usize, found: usize },
	#[error("row {row} has {found} columns, expected {expected}")]
	RowShape {
		row: usize,
		expected: usize,
		found: usize,
	},
	#[error("{name} has {found} values, expected {expected}")]
	BlockShape {
		name: &'static str,
		expected: usize,
		found: usize,
	},
	#[error("the label {label:?} is not one of the model's classes")]
	UnknownLabel { label: String },
	#[error("the label {label:?} is not a number")]
	InvalidLabel { label: String },
	#[error("row {row} has an invalid weight {value:?}")]
	InvalidWeight { row: usize, value: String },
}

impl DatasetError {
	/// Returns true if the error describes a mismatch between the data and its expected shape rather than a problem with the configuration or reading the file.
	pub fn is_data_shape(&self) -> bool {
		matches!(
			self,
			DatasetError::RowShape { .. }
				| DatasetError::BlockShape { .. }
				| DatasetError::UnknownLabel { .. }
				| DatasetError::InvalidLabel { .. }
				| DatasetError::InvalidWeight { .. }
				| DatasetError::MissingFeatures { .. }
		)
	}
}
