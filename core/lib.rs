/*!
This crate evaluates metrics of a tree ensemble at regular checkpoints along its sequence of trees. The entry point is [`eval_metrics`](fn.eval_metrics.html), which reads the model and dataset named in an [`EvalMetricsOptions`](struct.EvalMetricsOptions.html), computes every metric at every checkpoint with a [`MetricsPlotCalcer`](struct.MetricsPlotCalcer.html), and writes the results.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod approx;
mod error;
mod options;
mod plot;
mod result;
pub mod snapshot;

pub use self::error::Error;
pub use self::options::{EvalMetricsOptions, FRESH_TMP_DIR};
pub use self::plot::{CalcerState, MetricsPlotCalcer, PlotSettings};
pub use self::result::{ResultTable, METRICS_FILE_NAME};

use gbeval_dataframe::{for_each_block, ColumnDescription, DataBlock, DatasetSource, LabelConverter};
use gbeval_metrics::MetricSet;
use gbeval_tree::Ensemble;
use gbeval_util::WorkerPool;

/**
Run a complete evaluation: load the model and check it against the column description, parse the metrics, compute additive metrics in one pass over the dataset, compute non-additive metrics either in passes over batches of checkpoints or from the whole dataset in memory, and write the results to `options.result_dir`.
*/
pub fn eval_metrics(options: &EvalMetricsOptions, pool: &WorkerPool) -> Result<ResultTable, Error> {
	// Load the model and make sure the dataset can supply its categorical features before reading any data.
	let ensemble = Ensemble::from_path(&options.model_path, options.model_format)?;
	let column_description = options
		.column_description_path
		.as_deref()
		.map(ColumnDescription::from_path)
		.transpose()?;
	ensemble.check_column_description(column_description.as_ref())?;

	let metrics = MetricSet::from_description(&options.metrics, ensemble.approx_dimension)?;
	let mut calcer = MetricsPlotCalcer::new(
		&ensemble,
		&metrics,
		pool,
		PlotSettings {
			first_iteration: options.first_iteration,
			end_iteration: options.end_iteration,
			step: options.step,
			processed_iterations_step: options.processed_iterations_step,
			tmp_dir: options.tmp_dir().map(|tmp_dir| tmp_dir.to_owned()),
		},
	)?;

	let label_converter = LabelConverter::new(&ensemble.class_names);
	let source = DatasetSource {
		path: options.input_path.clone(),
		delimiter: options.delimiter_byte()?,
		has_header: options.has_header,
		column_description: column_description.unwrap_or_else(ColumnDescription::label_first),
	};
	let block_size = options.block_size;

	// Calc-on-whole keeps the blocks of the first pass for the non-additive metrics.
	let retain_blocks = !options.calc_on_parts && metrics.has_non_additive();
	let mut retained_blocks: Vec<DataBlock> = Vec::new();
	if metrics.has_additive() {
		tracing::info!("computing additive metrics");
		for_each_block::<_, Error>(
			&source,
			&ensemble.features,
			block_size,
			&label_converter,
			|block| {
				calcer.proceed_dataset_for_additive_metrics(&block)?;
				if retain_blocks {
					retained_blocks.push(block);
				}
				Ok(())
			},
		)?;
		calcer.finish_proceed_dataset_for_additive_metrics()?;
	}

	if metrics.has_non_additive() {
		if options.calc_on_parts {
			while !calcer.are_all_iterations_processed() {
				tracing::info!("starting a pass for non-additive metrics");
				for_each_block::<_, Error>(
					&source,
					&ensemble.features,
					block_size,
					&label_converter,
					|block| calcer.proceed_dataset_for_non_additive_metrics(&block),
				)?;
				calcer.finish_proceed_dataset_for_non_additive_metrics()?;
			}
		} else {
			if !metrics.has_additive() {
				for_each_block::<_, Error>(
					&source,
					&ensemble.features,
					block_size,
					&label_converter,
					|block| {
						retained_blocks.push(block);
						Ok(())
					},
				)?;
			}
			tracing::info!(n_blocks = retained_blocks.len(), "computing non-additive metrics");
			calcer.compute_non_additive_metrics(&retained_blocks)?;
		}
	}

	calcer.save_result(&options.result_dir, options.save_stats)?;
	calcer.clear_temp_files()?;
	let result = calcer
		.result_table()
		.cloned()
		.ok_or(Error::InvalidState {
			operation: "eval_metrics",
			state: "not finalized",
		})?;
	Ok(result)
}
