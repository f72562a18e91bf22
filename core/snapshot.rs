/*!
This module stores per-block approxes and labels on disk between the passes of a calc-on-parts run. Everything lives in one temporary directory that is removed when the store is closed or dropped.
*/

use super::Error;
use ndarray::prelude::*;
use std::{
	fs::File,
	io::{BufReader, BufWriter},
	path::{Path, PathBuf},
};
use tempfile::TempDir;

/// The labels of one block, saved once so later passes can rebuild the full dataset's labels without keeping its features.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BlockLabels {
	pub target: Vec<f32>,
	pub weights: Option<Vec<f32>>,
	pub query_ids: Option<Vec<u64>>,
}

#[derive(Debug)]
pub struct SnapshotStore {
	dir: TempDir,
}

impl SnapshotStore {
	/// Create a fresh directory inside `parent`, or inside the system temporary directory if `parent` is `None`.
	pub fn create(parent: Option<&Path>) -> Result<SnapshotStore, Error> {
		let builder = {
			let mut builder = tempfile::Builder::new();
			builder.prefix("gbeval-");
			builder
		};
		let dir = match parent {
			Some(parent) => {
				std::fs::create_dir_all(parent).map_err(|source| Error::Resource {
					path: parent.to_owned(),
					source,
				})?;
				builder.tempdir_in(parent)
			}
			None => builder.tempdir(),
		}
		.map_err(|source| Error::Resource {
			path: parent
				.map(Path::to_owned)
				.unwrap_or_else(std::env::temp_dir),
			source,
		})?;
		tracing::debug!(path = %dir.path().display(), "created snapshot directory");
		Ok(SnapshotStore { dir })
	}

	pub fn path(&self) -> &Path {
		self.dir.path()
	}

	pub fn write_approx(
		&self,
		block_index: usize,
		checkpoint_index: usize,
		approx: &Array2<f64>,
	) -> Result<(), Error> {
		self.write(&self.approx_path(block_index, checkpoint_index), approx)
	}

	pub fn read_approx(
		&self,
		block_index: usize,
		checkpoint_index: usize,
	) -> Result<Array2<f64>, Error> {
		self.read(&self.approx_path(block_index, checkpoint_index))
	}

	pub fn remove_approx(&self, block_index: usize, checkpoint_index: usize) -> Result<(), Error> {
		let path = self.approx_path(block_index, checkpoint_index);
		std::fs::remove_file(&path).map_err(|source| Error::Resource { path, source })
	}

	pub fn write_labels(&self, block_index: usize, labels: &BlockLabels) -> Result<(), Error> {
		self.write(&self.labels_path(block_index), labels)
	}

	pub fn read_labels(&self, block_index: usize) -> Result<BlockLabels, Error> {
		self.read(&self.labels_path(block_index))
	}

	/// Remove the directory and everything in it.
	pub fn close(self) -> Result<(), Error> {
		let path = self.dir.path().to_owned();
		self.dir
			.close()
			.map_err(|source| Error::Resource { path, source })
	}

	fn approx_path(&self, block_index: usize, checkpoint_index: usize) -> PathBuf {
		self.dir
			.path()
			.join(format!("approx_{}_{}.bin", block_index, checkpoint_index))
	}

	fn labels_path(&self, block_index: usize) -> PathBuf {
		self.dir.path().join(format!("labels_{}.bin", block_index))
	}

	fn write<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), Error> {
		let file = File::create(path).map_err(|source| Error::Resource {
			path: path.to_owned(),
			source,
		})?;
		let mut writer = BufWriter::new(file);
		bincode::serialize_into(&mut writer, value)?;
		std::io::Write::flush(&mut writer).map_err(|source| Error::Resource {
			path: path.to_owned(),
			source,
		})?;
		Ok(())
	}

	fn read<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<T, Error> {
		let file = File::open(path).map_err(|source| Error::Resource {
			path: path.to_owned(),
			source,
		})?;
		let value = bincode::deserialize_from(BufReader::new(file))?;
		Ok(value)
	}
}

#[test]
fn test_round_trip_and_close() {
	let parent = tempfile::tempdir().unwrap();
	let store = SnapshotStore::create(Some(parent.path())).unwrap();
	let approx = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
	store.write_approx(0, 3, &approx).unwrap();
	assert_eq!(store.read_approx(0, 3).unwrap(), approx);
	let labels = BlockLabels {
		target: vec![0.0, 1.0],
		weights: None,
		query_ids: Some(vec![5, 5]),
	};
	store.write_labels(0, &labels).unwrap();
	assert_eq!(store.read_labels(0).unwrap(), labels);
	store.remove_approx(0, 3).unwrap();
	assert!(matches!(store.read_approx(0, 3), Err(Error::Resource { .. })));
	let path = store.path().to_owned();
	assert!(path.starts_with(parent.path()));
	store.close().unwrap();
	assert!(!path.exists());
}
