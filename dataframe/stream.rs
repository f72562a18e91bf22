use super::{
	ColumnDescription, ColumnLayout, ColumnType, DataBlock, DatasetError, LabelConverter,
};
use fnv::{FnvHashMap, FnvHasher};
use ndarray::prelude::*;
use std::{fs::File, hash::Hasher, io::BufReader, path::PathBuf};

/// A `DatasetSource` tells [`for_each_block`](fn.for_each_block.html) where a dataset lives and how to read it.
#[derive(Clone, Debug)]
pub struct DatasetSource {
	pub path: PathBuf,
	pub delimiter: u8,
	pub has_header: bool,
	pub column_description: ColumnDescription,
}

impl DatasetSource {
	/// A tab separated file without a header whose first column is the label.
	pub fn new(path: impl Into<PathBuf>) -> DatasetSource {
		DatasetSource {
			path: path.into(),
			delimiter: b'\t',
			has_header: false,
			column_description: ColumnDescription::label_first(),
		}
	}
}

/**
Read the dataset at `source` in blocks of `block_size` documents and call `callback` once for each block, in dataset order. The final block may be shorter. If the dataset has a group id column, a block is extended past `block_size` until the group id changes so that no query group is split between blocks.

`feature_types` has one entry per model feature. Feature columns are matched to it by position and extra feature columns are ignored. Targets are produced by `label_converter` before `callback` sees the block.

Every call opens the file again, so calling this function several times gives independent passes over the same data. Returns the number of blocks read.
*/
pub fn for_each_block<F, E>(
	source: &DatasetSource,
	feature_types: &[ColumnType],
	block_size: usize,
	label_converter: &LabelConverter,
	mut callback: F,
) -> Result<usize, E>
where
	F: FnMut(DataBlock) -> Result<(), E>,
	E: From<DatasetError>,
{
	if block_size == 0 {
		return Err(DatasetError::ZeroBlockSize.into());
	}
	let file = File::open(&source.path).map_err(|error| DatasetError::Open {
		path: source.path.clone(),
		source: error,
	})?;
	let mut reader = csv::ReaderBuilder::new()
		.delimiter(source.delimiter)
		.has_headers(source.has_header)
		.flexible(true)
		.from_reader(BufReader::new(file));
	let mut builder = if source.has_header {
		let n_columns = reader.byte_headers().map_err(DatasetError::from)?.len();
		Some(BlockBuilder::new(
			source,
			n_columns,
			feature_types,
			label_converter,
		)?)
	} else {
		None
	};
	let mut record = csv::ByteRecord::new();
	let mut row_index = 0;
	let mut offset = 0;
	let mut n_blocks = 0;
	while reader
		.read_byte_record(&mut record)
		.map_err(DatasetError::from)?
	{
		// Without a header, the first record determines the number of columns.
		if builder.is_none() {
			builder = Some(BlockBuilder::new(
				source,
				record.len(),
				feature_types,
				label_converter,
			)?);
		}
		if let Some(builder) = builder.as_mut() {
			if builder.n_documents >= block_size && builder.can_split_before(&record) {
				let block = builder.flush(offset)?;
				offset += block.n_documents();
				n_blocks += 1;
				tracing::debug!(offset = block.offset, n_documents = block.n_documents(), "read block");
				callback(block)?;
			}
			builder.push(row_index, &record)?;
		}
		row_index += 1;
	}
	if let Some(builder) = builder.as_mut() {
		if builder.n_documents > 0 {
			let block = builder.flush(offset)?;
			n_blocks += 1;
			tracing::debug!(offset = block.offset, n_documents = block.n_documents(), "read block");
			callback(block)?;
		}
	}
	Ok(n_blocks)
}

enum FeatureEncoder {
	Number,
	Enum(FnvHashMap<String, usize>),
}

struct BlockBuilder<'a> {
	layout: ColumnLayout,
	encoders: Vec<(usize, FeatureEncoder)>,
	label_converter: &'a LabelConverter,
	n_documents: usize,
	features: Vec<f32>,
	labels: Vec<String>,
	weights: Option<Vec<f32>>,
	query_ids: Option<Vec<u64>>,
}

impl<'a> BlockBuilder<'a> {
	fn new(
		source: &DatasetSource,
		n_columns: usize,
		feature_types: &[ColumnType],
		label_converter: &'a LabelConverter,
	) -> Result<BlockBuilder<'a>, DatasetError> {
		let min_columns = source.column_description.min_columns();
		if n_columns < min_columns {
			return Err(DatasetError::RowShape {
				row: 0,
				expected: min_columns,
				found: n_columns,
			});
		}
		let layout = source.column_description.layout(n_columns);
		if layout.label.is_none() {
			return Err(DatasetError::MissingLabel);
		}
		if layout.features.len() < feature_types.len() {
			return Err(DatasetError::MissingFeatures {
				expected: feature_types.len(),
				found: layout.features.len(),
			});
		}
		let encoders = layout
			.features
			.iter()
			.zip(feature_types.iter())
			.map(|((column_index, _), feature_type)| {
				let encoder = match feature_type {
					ColumnType::Number => FeatureEncoder::Number,
					ColumnType::Enum { options } => FeatureEncoder::Enum(
						options
							.iter()
							.enumerate()
							.map(|(index, option)| (option.clone(), index))
							.collect(),
					),
				};
				(*column_index, encoder)
			})
			.collect();
		let weights = layout.weight.map(|_| Vec::new());
		let query_ids = layout.group_id.map(|_| Vec::new());
		Ok(BlockBuilder {
			layout,
			encoders,
			label_converter,
			n_documents: 0,
			features: Vec::new(),
			labels: Vec::new(),
			weights,
			query_ids,
		})
	}

	/// A block may end before `record` unless `record` continues the query group of the previous document.
	fn can_split_before(&self, record: &csv::ByteRecord) -> bool {
		match (self.layout.group_id, self.query_ids.as_ref()) {
			(Some(column_index), Some(query_ids)) => {
				let query_id = parse_query_id(record.get(column_index).unwrap_or_default());
				query_ids.last() != Some(&query_id)
			}
			_ => true,
		}
	}

	fn push(&mut self, row_index: usize, record: &csv::ByteRecord) -> Result<(), DatasetError> {
		if record.len() != self.layout.n_columns {
			return Err(DatasetError::RowShape {
				row: row_index,
				expected: self.layout.n_columns,
				found: record.len(),
			});
		}
		// The column indexes in the layout are all < n_columns, which was checked above.
		let field = |column_index: usize| record.get(column_index).unwrap_or_default();
		for (column_index, encoder) in self.encoders.iter() {
			let value = field(*column_index);
			let value = match encoder {
				FeatureEncoder::Number => lexical::parse::<f32, _>(value).unwrap_or(std::f32::NAN),
				FeatureEncoder::Enum(options) => std::str::from_utf8(value)
					.ok()
					.and_then(|value| options.get(value))
					.map(|index| (index + 1) as f32)
					.unwrap_or(0.0),
			};
			self.features.push(value);
		}
		if let Some(label_index) = self.layout.label {
			self.labels
				.push(String::from_utf8_lossy(field(label_index)).into_owned());
		}
		if let (Some(column_index), Some(weights)) = (self.layout.weight, self.weights.as_mut()) {
			let value = field(column_index);
			let weight = match lexical::parse::<f32, _>(value) {
				Ok(weight) if weight.is_finite() && weight >= 0.0 => weight,
				_ => {
					return Err(DatasetError::InvalidWeight {
						row: row_index,
						value: String::from_utf8_lossy(value).into_owned(),
					})
				}
			};
			weights.push(weight);
		}
		if let (Some(column_index), Some(query_ids)) =
			(self.layout.group_id, self.query_ids.as_mut())
		{
			query_ids.push(parse_query_id(field(column_index)));
		}
		self.n_documents += 1;
		Ok(())
	}

	fn flush(&mut self, offset: usize) -> Result<DataBlock, DatasetError> {
		let n_documents = self.n_documents;
		let n_features = self.encoders.len();
		let features = std::mem::take(&mut self.features);
		let features = Array2::from_shape_vec((n_documents, n_features), features).map_err(|_| {
			DatasetError::BlockShape {
				name: "features",
				expected: n_documents * n_features,
				found: 0,
			}
		})?;
		let labels = std::mem::take(&mut self.labels);
		let target = self.label_converter.compress(&labels)?;
		let weights = self.weights.as_mut().map(std::mem::take);
		let query_ids = self.query_ids.as_mut().map(std::mem::take);
		self.n_documents = 0;
		DataBlock::new(offset, features, target, weights, query_ids)
	}
}

/// Numeric group ids are used as is. Any other group id is hashed.
fn parse_query_id(value: &[u8]) -> u64 {
	match lexical::parse::<u64, _>(value) {
		Ok(query_id) => query_id,
		Err(_) => {
			let mut hasher = FnvHasher::default();
			hasher.write(value);
			hasher.finish()
		}
	}
}

#[cfg(test)]
fn write_dataset(contents: &str) -> tempfile::NamedTempFile {
	use std::io::Write;
	let mut file = tempfile::NamedTempFile::new().unwrap();
	file.write_all(contents.as_bytes()).unwrap();
	file.flush().unwrap();
	file
}

#[cfg(test)]
fn collect_blocks(
	source: &DatasetSource,
	feature_types: &[ColumnType],
	block_size: usize,
	label_converter: &LabelConverter,
) -> Result<Vec<DataBlock>, DatasetError> {
	let mut blocks = Vec::new();
	for_each_block(
		source,
		feature_types,
		block_size,
		label_converter,
		|block| -> Result<(), DatasetError> {
			blocks.push(block);
			Ok(())
		},
	)?;
	Ok(blocks)
}

#[test]
fn test_blocks_are_bounded_and_ordered() {
	let file = write_dataset("0\t1.5\t2\n1\t2.5\t3\n1\tnan\t4\n0\t4.5\t5\n1\t5.5\t6\n");
	let source = DatasetSource::new(file.path());
	let feature_types = vec![ColumnType::Number, ColumnType::Number];
	let blocks = collect_blocks(&source, &feature_types, 2, &LabelConverter::default()).unwrap();
	let sizes: Vec<usize> = blocks.iter().map(|block| block.n_documents()).collect();
	assert_eq!(sizes, vec![2, 2, 1]);
	let offsets: Vec<usize> = blocks.iter().map(|block| block.offset).collect();
	assert_eq!(offsets, vec![0, 2, 4]);
	assert_eq!(blocks[0].target, vec![0.0, 1.0]);
	assert!(blocks[1].features[[0, 0]].is_nan());
	assert_eq!(blocks[2].features, arr2(&[[5.5, 6.0]]));
}

#[test]
fn test_passes_are_independent() {
	let file = write_dataset("a\t1\nb\t2\na\t3\n");
	let source = DatasetSource::new(file.path());
	let feature_types = vec![ColumnType::Number];
	let label_converter = LabelConverter::new(&["a".to_owned(), "b".to_owned()]);
	let first = collect_blocks(&source, &feature_types, 2, &label_converter).unwrap();
	let second = collect_blocks(&source, &feature_types, 2, &label_converter).unwrap();
	assert_eq!(first, second);
	assert_eq!(first[0].target, vec![0.0, 1.0]);
}

#[test]
fn test_query_groups_are_not_split() {
	let file = write_dataset("1\t10\t0.1\n0\t10\t0.2\n1\t10\t0.3\n0\t11\t0.4\n1\t12\t0.5\n");
	let mut source = DatasetSource::new(file.path());
	source.column_description = "0\tLabel\n1\tGroupId\n".parse().unwrap();
	let feature_types = vec![ColumnType::Number];
	let blocks = collect_blocks(&source, &feature_types, 2, &LabelConverter::default()).unwrap();
	let sizes: Vec<usize> = blocks.iter().map(|block| block.n_documents()).collect();
	assert_eq!(sizes, vec![3, 2]);
	assert_eq!(blocks[0].query_ids, Some(vec![10, 10, 10]));
	assert_eq!(blocks[1].query_ids, Some(vec![11, 12]));
}

#[test]
fn test_enum_features_and_weights() {
	let file = write_dataset("label,color,size,w\n1,red,3,0.5\n0,blue,4,2\n0,green,5,1\n");
	let source = DatasetSource {
		path: file.path().to_owned(),
		delimiter: b',',
		has_header: true,
		column_description: "0\tLabel\n1\tCateg\n3\tWeight\n".parse().unwrap(),
	};
	let feature_types = vec![
		ColumnType::Enum {
			options: vec!["red".to_owned(), "blue".to_owned()],
		},
		ColumnType::Number,
	];
	let blocks = collect_blocks(&source, &feature_types, 10, &LabelConverter::default()).unwrap();
	assert_eq!(blocks.len(), 1);
	assert_eq!(blocks[0].features, arr2(&[[1.0, 3.0], [2.0, 4.0], [0.0, 5.0]]));
	assert_eq!(blocks[0].weights, Some(vec![0.5, 2.0, 1.0]));
}

#[test]
fn test_row_shape_error() {
	let file = write_dataset("0\t1\t2\n1\t2\n");
	let source = DatasetSource::new(file.path());
	let feature_types = vec![ColumnType::Number, ColumnType::Number];
	let result = collect_blocks(&source, &feature_types, 10, &LabelConverter::default());
	assert!(matches!(
		result,
		Err(DatasetError::RowShape {
			row: 1,
			expected: 3,
			found: 2
		})
	));
}

#[test]
fn test_missing_features_error() {
	let file = write_dataset("0\t1\n");
	let source = DatasetSource::new(file.path());
	let feature_types = vec![ColumnType::Number, ColumnType::Number];
	let result = collect_blocks(&source, &feature_types, 10, &LabelConverter::default());
	assert!(matches!(result, Err(DatasetError::MissingFeatures { .. })));
}

#[test]
fn test_infinite_values_are_kept() {
	let file = write_dataset("0\tinf\n1\t-inf\n0\t1e39\n1\tabc\n");
	let source = DatasetSource::new(file.path());
	let feature_types = vec![ColumnType::Number];
	let blocks = collect_blocks(&source, &feature_types, 10, &LabelConverter::default()).unwrap();
	let features = &blocks[0].features;
	assert_eq!(features[[0, 0]], std::f32::INFINITY);
	assert_eq!(features[[1, 0]], std::f32::NEG_INFINITY);
	assert_eq!(features[[2, 0]], std::f32::INFINITY);
	assert!(features[[3, 0]].is_nan());
}
