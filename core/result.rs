use super::Error;
use gbeval_metrics::MetricHolder;
use std::path::{Path, PathBuf};

/// The name of the file `write_tsv` writes metric values to.
pub const METRICS_FILE_NAME: &str = "metrics.tsv";

/**
A `ResultTable` holds the value of every metric at every checkpoint, along with the statistics each value was finalized from.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct ResultTable {
	/// The iteration of each checkpoint, in increasing order.
	pub iterations: Vec<usize>,
	/// The description of each metric, in the order of the metrics description.
	pub metric_descriptions: Vec<String>,
	/// (n_checkpoints, n_metrics)
	pub stats: Vec<Vec<MetricHolder>>,
	/// (n_checkpoints, n_metrics)
	pub values: Vec<Vec<f64>>,
}

impl ResultTable {
	pub fn n_checkpoints(&self) -> usize {
		self.iterations.len()
	}

	/// The value of the metric with `description` at every checkpoint, or `None` if no metric has that description.
	pub fn metric_values(&self, description: &str) -> Option<Vec<f64>> {
		let metric_index = self
			.metric_descriptions
			.iter()
			.position(|metric_description| metric_description == description)?;
		Some(
			self.values
				.iter()
				.map(|row| row[metric_index])
				.collect(),
		)
	}

	/**
	Write `metrics.tsv` to `result_dir`, with an `iteration` column followed by one column per metric and one row per checkpoint. If `save_stats` is true, also write a `<metric>_stats.tsv` per metric with the raw error and weight at each checkpoint. Returns the paths of the written files.
	*/
	pub fn write_tsv(&self, result_dir: &Path, save_stats: bool) -> Result<Vec<PathBuf>, Error> {
		std::fs::create_dir_all(result_dir)?;
		let mut paths = Vec::new();
		let path = result_dir.join(METRICS_FILE_NAME);
		let mut writer = tsv_writer(&path)?;
		let mut header = vec!["iteration".to_owned()];
		header.extend(self.metric_descriptions.iter().cloned());
		writer.write_record(&header)?;
		for (iteration, values) in self.iterations.iter().zip(self.values.iter()) {
			let mut record = vec![iteration.to_string()];
			record.extend(values.iter().map(|value| value.to_string()));
			writer.write_record(&record)?;
		}
		writer.flush()?;
		paths.push(path);
		if save_stats {
			for (metric_index, description) in self.metric_descriptions.iter().enumerate() {
				let path = result_dir.join(format!("{}_stats.tsv", file_stem(description)));
				let mut writer = tsv_writer(&path)?;
				writer.write_record(&["iteration", "error", "weight"])?;
				for (iteration, stats) in self.iterations.iter().zip(self.stats.iter()) {
					let holder = stats[metric_index];
					writer.write_record(&[
						iteration.to_string(),
						holder.error.to_string(),
						holder.weight.to_string(),
					])?;
				}
				writer.flush()?;
				paths.push(path);
			}
		}
		tracing::info!(result_dir = %result_dir.display(), n_files = paths.len(), "wrote results");
		Ok(paths)
	}
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>, Error> {
	let writer = csv::WriterBuilder::new()
		.delimiter(b'\t')
		.from_path(path)?;
	Ok(writer)
}

/// Metric descriptions can contain characters such as `:` and `=`. Anything but letters, digits, `-`, `_` and `.` becomes `_`.
fn file_stem(description: &str) -> String {
	description
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
				c
			} else {
				'_'
			}
		})
		.collect()
}

#[cfg(test)]
fn table() -> ResultTable {
	ResultTable {
		iterations: vec![0, 10],
		metric_descriptions: vec!["RMSE".to_owned(), "Quantile:alpha=0.3".to_owned()],
		stats: vec![
			vec![MetricHolder::new(4.0, 1.0), MetricHolder::new(1.5, 2.0)],
			vec![MetricHolder::new(1.0, 1.0), MetricHolder::new(0.5, 2.0)],
		],
		values: vec![vec![2.0, 0.75], vec![1.0, 0.25]],
	}
}

#[test]
fn test_metric_values() {
	let table = table();
	assert_eq!(table.n_checkpoints(), 2);
	assert_eq!(table.metric_values("RMSE"), Some(vec![2.0, 1.0]));
	assert_eq!(table.metric_values("AUC"), None);
}

#[test]
fn test_write_tsv() {
	let dir = tempfile::tempdir().unwrap();
	let paths = table().write_tsv(dir.path(), true).unwrap();
	assert_eq!(paths.len(), 3);
	let metrics = std::fs::read_to_string(dir.path().join("metrics.tsv")).unwrap();
	insta::assert_snapshot!(metrics.trim_end(), @r###"
iteration	RMSE	Quantile:alpha=0.3
0	2	0.75
10	1	0.25
"###);
	let stats = std::fs::read_to_string(dir.path().join("Quantile_alpha_0.3_stats.tsv")).unwrap();
	insta::assert_snapshot!(stats.trim_end(), @r###"
iteration	error	weight
0	1.5	2
10	0.5	2
"###);
}
