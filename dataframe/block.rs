use super::DatasetError;
use ndarray::prelude::*;

/// A `DataBlock` is a contiguous slice of a dataset. All of its columns have one value per document.
#[derive(Clone, Debug, PartialEq)]
pub struct DataBlock {
	/// The index in the full dataset of this block's first document.
	pub offset: usize,
	/// (n_documents, n_features)
	pub features: Array2<f32>,
	/// (n_documents)
	pub target: Vec<f32>,
	/// (n_documents)
	pub weights: Option<Vec<f32>>,
	/// (n_documents)
	pub query_ids: Option<Vec<u64>>,
}

impl DataBlock {
	pub fn new(
		offset: usize,
		features: Array2<f32>,
		target: Vec<f32>,
		weights: Option<Vec<f32>>,
		query_ids: Option<Vec<u64>>,
	) -> Result<DataBlock, DatasetError> {
		let n_documents = features.nrows();
		check_len("target", n_documents, target.len())?;
		if let Some(weights) = weights.as_ref() {
			check_len("weights", n_documents, weights.len())?;
		}
		if let Some(query_ids) = query_ids.as_ref() {
			check_len("query ids", n_documents, query_ids.len())?;
		}
		Ok(DataBlock {
			offset,
			features,
			target,
			weights,
			query_ids,
		})
	}

	pub fn n_documents(&self) -> usize {
		self.features.nrows()
	}

	pub fn n_features(&self) -> usize {
		self.features.ncols()
	}

	/// Concatenate blocks that were read in dataset order into a single block holding the whole dataset.
	pub fn concat(blocks: &[DataBlock]) -> Result<DataBlock, DatasetError> {
		let n_features = blocks.first().map(|block| block.n_features()).unwrap_or(0);
		for block in blocks {
			check_len("block features", n_features, block.n_features())?;
		}
		let views: Vec<ArrayView2<f32>> = blocks.iter().map(|block| block.features.view()).collect();
		let features = if views.is_empty() {
			Array2::zeros((0, n_features))
		} else {
			ndarray::concatenate(Axis(0), &views).map_err(|_| DatasetError::BlockShape {
				name: "block features",
				expected: n_features,
				found: 0,
			})?
		};
		let target = blocks
			.iter()
			.flat_map(|block| block.target.iter().copied())
			.collect();
		let weights = if blocks.iter().any(|block| block.weights.is_some()) {
			Some(
				blocks
					.iter()
					.flat_map(|block| match block.weights.as_ref() {
						Some(weights) => weights.clone(),
						None => vec![1.0; block.n_documents()],
					})
					.collect(),
			)
		} else {
			None
		};
		let query_ids = if blocks.iter().all(|block| block.query_ids.is_some()) && !blocks.is_empty() {
			Some(
				blocks
					.iter()
					.flat_map(|block| block.query_ids.iter().flatten().copied())
					.collect(),
			)
		} else {
			None
		};
		DataBlock::new(0, features, target, weights, query_ids)
	}
}

fn check_len(name: &'static str, expected: usize, found: usize) -> Result<(), DatasetError> {
	if expected == found {
		Ok(())
	} else {
		Err(DatasetError::BlockShape {
			name,
			expected,
			found,
		})
	}
}

#[test]
fn test_new_checks_lengths() {
	let features = Array2::zeros((3, 2));
	assert!(DataBlock::new(0, features.clone(), vec![0.0; 3], None, None).is_ok());
	assert!(DataBlock::new(0, features.clone(), vec![0.0; 2], None, None).is_err());
	assert!(DataBlock::new(0, features, vec![0.0; 3], Some(vec![1.0; 4]), None).is_err());
}

#[test]
fn test_concat() {
	let a = DataBlock::new(0, arr2(&[[1.0], [2.0]]), vec![0.0, 1.0], None, None).unwrap();
	let b = DataBlock::new(2, arr2(&[[3.0]]), vec![1.0], Some(vec![2.0]), None).unwrap();
	let whole = DataBlock::concat(&[a, b]).unwrap();
	assert_eq!(whole.features, arr2(&[[1.0], [2.0], [3.0]]));
	assert_eq!(whole.target, vec![0.0, 1.0, 1.0]);
	assert_eq!(whole.weights, Some(vec![1.0, 1.0, 2.0]));
	assert_eq!(whole.query_ids, None);
}
