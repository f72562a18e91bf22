/*!
This module contains [`MetricsPlotCalcer`](struct.MetricsPlotCalcer.html), which evaluates a [`MetricSet`](../../gbeval_metrics/struct.MetricSet.html) at every checkpoint of an ensemble.

Additive metrics are computed in a single pass over the dataset. Each block's approx starts at the neutral value and is advanced through the checkpoints in order, and the metric statistics of the block at each checkpoint are merged into that checkpoint's totals.

Non-additive metrics need the approx of every document at once. They are either computed from the blocks retained in memory (calc-on-whole), or in several passes that each handle a batch of checkpoints and keep the per-block approxes in a [`SnapshotStore`](../snapshot/struct.SnapshotStore.html) between passes (calc-on-parts). A calc-on-parts pass starts each block from the approx saved at the last checkpoint of the previous batch, so no tree is applied to a block twice.
*/

use super::{
	approx::ApproxUpdater,
	snapshot::{BlockLabels, SnapshotStore},
	Error, ResultTable,
};
use gbeval_dataframe::DataBlock;
use gbeval_metrics::{MetricHolder, MetricInput, MetricSet, StreamingMetric};
use gbeval_tree::Ensemble;
use gbeval_util::WorkerPool;
use ndarray::prelude::*;
use std::path::{Path, PathBuf};

/// The checkpoints to evaluate and where to keep temporary files.
#[derive(Clone, Debug, PartialEq)]
pub struct PlotSettings {
	pub first_iteration: usize,
	/// The iteration to stop before. 0 means the number of trees in the ensemble.
	pub end_iteration: usize,
	pub step: usize,
	/// The number of checkpoints each calc-on-parts pass handles.
	pub processed_iterations_step: usize,
	/// The directory to create temporary storage in, or `None` for the system temporary directory.
	pub tmp_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalcerState {
	Created,
	AdditiveDataLoaded,
	NonAdditivePending,
	Finalized,
	Saved,
}

impl CalcerState {
	fn name(self) -> &'static str {
		match self {
			CalcerState::Created => "created",
			CalcerState::AdditiveDataLoaded => "done with additive metrics",
			CalcerState::NonAdditivePending => "computing non-additive metrics",
			CalcerState::Finalized => "finalized",
			CalcerState::Saved => "saved",
		}
	}
}

pub struct MetricsPlotCalcer<'a> {
	ensemble: &'a Ensemble,
	metrics: &'a MetricSet,
	pool: &'a WorkerPool,
	updater: ApproxUpdater,
	/// The iteration of each checkpoint. The approx at a checkpoint includes every tree before its iteration.
	iterations: Vec<usize>,
	processed_iterations_step: usize,
	tmp_dir: Option<PathBuf>,
	snapshots: Option<SnapshotStore>,
	/// (n_checkpoints, n_metrics)
	stats: Vec<Vec<MetricHolder>>,
	state: CalcerState,
	/// The number of checkpoints whose non-additive metrics are computed. Checkpoints are processed in order.
	n_processed: usize,
	/// The number of blocks seen in the current calc-on-parts pass.
	pass_n_blocks: usize,
	/// The number of blocks in the dataset, known after the first calc-on-parts pass.
	n_blocks: Option<usize>,
	result: Option<ResultTable>,
}

impl<'a> MetricsPlotCalcer<'a> {
	pub fn new(
		ensemble: &'a Ensemble,
		metrics: &'a MetricSet,
		pool: &'a WorkerPool,
		settings: PlotSettings,
	) -> Result<MetricsPlotCalcer<'a>, Error> {
		let n_trees = ensemble.n_trees();
		let end_iteration = if settings.end_iteration == 0 {
			n_trees
		} else {
			settings.end_iteration
		};
		if end_iteration > n_trees {
			return Err(Error::Configuration(format!(
				"the end iteration {} is past the last of the model's {} trees",
				end_iteration, n_trees
			)));
		}
		if settings.first_iteration >= end_iteration {
			return Err(Error::Configuration(format!(
				"the first iteration {} must be less than the end iteration {}",
				settings.first_iteration, end_iteration
			)));
		}
		if settings.step == 0 {
			return Err(Error::Configuration("the step must be positive".to_owned()));
		}
		if settings.processed_iterations_step == 0 {
			return Err(Error::Configuration(
				"the processed iterations step must be positive".to_owned(),
			));
		}
		let iterations: Vec<usize> = (settings.first_iteration..end_iteration)
			.step_by(settings.step)
			.collect();
		tracing::info!(
			n_checkpoints = iterations.len(),
			first_iteration = settings.first_iteration,
			end_iteration,
			step = settings.step,
			"resolved checkpoints"
		);
		let stats = vec![vec![MetricHolder::default(); metrics.len()]; iterations.len()];
		Ok(MetricsPlotCalcer {
			ensemble,
			metrics,
			pool,
			updater: ApproxUpdater::for_loss_function(&ensemble.loss_function),
			iterations,
			processed_iterations_step: settings.processed_iterations_step,
			tmp_dir: settings.tmp_dir,
			snapshots: None,
			stats,
			state: CalcerState::Created,
			n_processed: 0,
			pass_n_blocks: 0,
			n_blocks: None,
			result: None,
		})
	}

	pub fn state(&self) -> CalcerState {
		self.state
	}

	pub fn iterations(&self) -> &[usize] {
		&self.iterations
	}

	/// The results, available once every metric is computed.
	pub fn result_table(&self) -> Option<&ResultTable> {
		self.result.as_ref()
	}

	/// Advance `block` through every checkpoint and merge each additive metric's statistics for it.
	pub fn proceed_dataset_for_additive_metrics(&mut self, block: &DataBlock) -> Result<(), Error> {
		self.require(
			"proceed_dataset_for_additive_metrics",
			&[CalcerState::Created],
		)?;
		let mut approx = self
			.updater
			.neutral_approx(self.ensemble.approx_dimension, block.n_documents());
		let mut last_iteration = 0;
		for checkpoint_index in 0..self.iterations.len() {
			let iteration = self.iterations[checkpoint_index];
			self.updater.advance(
				self.pool,
				self.ensemble,
				block.features.view(),
				&mut approx,
				last_iteration..iteration,
			)?;
			last_iteration = iteration;
			let raw_approx = self.updater.to_raw(approx.view());
			let input = block_input(raw_approx.view(), block);
			for (metric_index, metric) in self.metrics.iter().enumerate() {
				if metric.is_additive() {
					let holder = metric.eval_block(&input)?;
					self.stats[checkpoint_index][metric_index].merge(holder);
				}
			}
		}
		tracing::debug!(offset = block.offset, "computed additive metrics for block");
		Ok(())
	}

	pub fn finish_proceed_dataset_for_additive_metrics(&mut self) -> Result<(), Error> {
		self.require(
			"finish_proceed_dataset_for_additive_metrics",
			&[CalcerState::Created],
		)?;
		tracing::info!("finished additive metrics");
		if self.metrics.has_non_additive() {
			self.state = CalcerState::AdditiveDataLoaded;
		} else {
			self.finalize();
		}
		Ok(())
	}

	pub fn are_all_iterations_processed(&self) -> bool {
		!self.metrics.has_non_additive() || self.n_processed == self.iterations.len()
	}

	/**
	Handle one block of a calc-on-parts pass. The block's approx is restored from the last checkpoint of the previous pass, advanced through this pass's checkpoints, and saved at each of them. Blocks must come in the same order and with the same sizes in every pass.
	*/
	pub fn proceed_dataset_for_non_additive_metrics(&mut self, block: &DataBlock) -> Result<(), Error> {
		self.require_non_additive_start("proceed_dataset_for_non_additive_metrics")?;
		if self.are_all_iterations_processed() {
			return Err(self.invalid_state("proceed_dataset_for_non_additive_metrics"));
		}
		self.state = CalcerState::NonAdditivePending;
		self.create_snapshots()?;
		let snapshots = self
			.snapshots
			.as_ref()
			.ok_or_else(|| self.invalid_state("proceed_dataset_for_non_additive_metrics"))?;
		let block_index = self.pass_n_blocks;
		let batch = self.current_batch();
		let (mut approx, mut last_iteration) = if batch.start == 0 {
			snapshots.write_labels(
				block_index,
				&BlockLabels {
					target: block.target.clone(),
					weights: block.weights.clone(),
					query_ids: block.query_ids.clone(),
				},
			)?;
			let approx = self
				.updater
				.neutral_approx(self.ensemble.approx_dimension, block.n_documents());
			(approx, 0)
		} else {
			let approx = snapshots.read_approx(block_index, batch.start - 1)?;
			if approx.ncols() != block.n_documents() {
				return Err(Error::DataShape(format!(
					"block {} has {} documents but had {} in the previous pass",
					block_index,
					block.n_documents(),
					approx.ncols()
				)));
			}
			(approx, self.iterations[batch.start - 1])
		};
		for checkpoint_index in batch {
			let iteration = self.iterations[checkpoint_index];
			self.updater.advance(
				self.pool,
				self.ensemble,
				block.features.view(),
				&mut approx,
				last_iteration..iteration,
			)?;
			last_iteration = iteration;
			snapshots.write_approx(block_index, checkpoint_index, &approx)?;
		}
		self.pass_n_blocks += 1;
		tracing::debug!(offset = block.offset, block_index, "saved approxes for block");
		Ok(())
	}

	/// Compute the non-additive metrics at each checkpoint of the pass that just ended, from the approxes saved during it.
	pub fn finish_proceed_dataset_for_non_additive_metrics(&mut self) -> Result<(), Error> {
		self.require_non_additive_start("finish_proceed_dataset_for_non_additive_metrics")?;
		if self.are_all_iterations_processed() {
			return Err(self.invalid_state("finish_proceed_dataset_for_non_additive_metrics"));
		}
		// A pass over an empty dataset sees no blocks.
		self.state = CalcerState::NonAdditivePending;
		self.create_snapshots()?;
		let n_blocks = match self.n_blocks {
			Some(n_blocks) if n_blocks != self.pass_n_blocks => {
				return Err(Error::DataShape(format!(
					"the dataset had {} blocks in the first pass but {} in this one",
					n_blocks, self.pass_n_blocks
				)))
			}
			_ => self.pass_n_blocks,
		};
		self.n_blocks = Some(n_blocks);
		let batch = self.current_batch();
		let snapshots = self
			.snapshots
			.as_ref()
			.ok_or_else(|| self.invalid_state("finish_proceed_dataset_for_non_additive_metrics"))?;
		let labels = (0..n_blocks)
			.map(|block_index| snapshots.read_labels(block_index))
			.collect::<Result<Vec<_>, _>>()?;
		let labels = concat_labels(labels);
		for checkpoint_index in batch.clone() {
			let approxes = (0..n_blocks)
				.map(|block_index| snapshots.read_approx(block_index, checkpoint_index))
				.collect::<Result<Vec<_>, _>>()?;
			let approx = concat_approxes(self.ensemble.approx_dimension, &approxes)?;
			let raw_approx = self.updater.to_raw(approx.view());
			let input = MetricInput {
				approx: raw_approx.view(),
				target: &labels.target,
				weights: labels.weights.as_deref(),
				query_ids: labels.query_ids.as_deref(),
			};
			for (metric_index, metric) in self.metrics.iter().enumerate() {
				if !metric.is_additive() {
					self.stats[checkpoint_index][metric_index] = metric.compute(&input)?;
				}
			}
		}
		// Only the approxes at the batch's last checkpoint are needed by the next pass.
		let last_checkpoint_index = batch.end - 1;
		for block_index in 0..n_blocks {
			if batch.start > 0 {
				snapshots.remove_approx(block_index, batch.start - 1)?;
			}
			for checkpoint_index in batch.start..last_checkpoint_index {
				snapshots.remove_approx(block_index, checkpoint_index)?;
			}
		}
		self.n_processed = batch.end;
		self.pass_n_blocks = 0;
		tracing::info!(
			n_processed = self.n_processed,
			n_checkpoints = self.iterations.len(),
			"finished a pass for non-additive metrics"
		);
		if self.are_all_iterations_processed() {
			self.finalize();
		}
		Ok(())
	}

	/// Compute the non-additive metrics at every checkpoint from the whole dataset, given as its blocks in dataset order.
	pub fn compute_non_additive_metrics(&mut self, blocks: &[DataBlock]) -> Result<(), Error> {
		self.require_non_additive_start("compute_non_additive_metrics")?;
		if self.state == CalcerState::NonAdditivePending || self.n_processed > 0 {
			return Err(self.invalid_state("compute_non_additive_metrics"));
		}
		let dataset = DataBlock::concat(blocks)?;
		let mut approx = self
			.updater
			.neutral_approx(self.ensemble.approx_dimension, dataset.n_documents());
		let mut last_iteration = 0;
		for checkpoint_index in 0..self.iterations.len() {
			let iteration = self.iterations[checkpoint_index];
			self.updater.advance(
				self.pool,
				self.ensemble,
				dataset.features.view(),
				&mut approx,
				last_iteration..iteration,
			)?;
			last_iteration = iteration;
			let raw_approx = self.updater.to_raw(approx.view());
			let input = block_input(raw_approx.view(), &dataset);
			for (metric_index, metric) in self.metrics.iter().enumerate() {
				if !metric.is_additive() {
					self.stats[checkpoint_index][metric_index] = metric.compute(&input)?;
				}
			}
		}
		self.n_processed = self.iterations.len();
		tracing::info!(
			n_documents = dataset.n_documents(),
			"computed non-additive metrics on the whole dataset"
		);
		self.finalize();
		Ok(())
	}

	/// Write the results to `result_dir`. This can only be done once, after every metric is computed.
	pub fn save_result(&mut self, result_dir: &Path, save_stats: bool) -> Result<(), Error> {
		self.require("save_result", &[CalcerState::Finalized])?;
		let result = match self.result.as_ref() {
			Some(result) => result,
			None => return Err(self.invalid_state("save_result")),
		};
		result.write_tsv(result_dir, save_stats)?;
		self.state = CalcerState::Saved;
		Ok(())
	}

	/// Remove the temporary storage, if any was created. Calling this more than once does nothing.
	pub fn clear_temp_files(&mut self) -> Result<(), Error> {
		if let Some(snapshots) = self.snapshots.take() {
			tracing::debug!(path = %snapshots.path().display(), "removing snapshot directory");
			snapshots.close()?;
		}
		Ok(())
	}

	fn create_snapshots(&mut self) -> Result<(), Error> {
		if self.snapshots.is_none() {
			self.snapshots = Some(SnapshotStore::create(self.tmp_dir.as_deref())?);
		}
		Ok(())
	}

	fn current_batch(&self) -> std::ops::Range<usize> {
		let start = self.n_processed;
		let end = (start + self.processed_iterations_step).min(self.iterations.len());
		start..end
	}

	fn finalize(&mut self) {
		let values = self
			.stats
			.iter()
			.map(|row| {
				self.metrics
					.iter()
					.zip(row.iter())
					.map(|(metric, holder)| metric.finalize(*holder))
					.collect()
			})
			.collect();
		self.result = Some(ResultTable {
			iterations: self.iterations.clone(),
			metric_descriptions: self
				.metrics
				.iter()
				.map(|metric| metric.description().to_owned())
				.collect(),
			stats: self.stats.clone(),
			values,
		});
		self.state = CalcerState::Finalized;
	}

	/// Non-additive metrics can be started once the additive pass is finished, or right away if there are no additive metrics.
	fn require_non_additive_start(&self, operation: &'static str) -> Result<(), Error> {
		match self.state {
			CalcerState::Created if !self.metrics.has_additive() => Ok(()),
			CalcerState::AdditiveDataLoaded | CalcerState::NonAdditivePending => Ok(()),
			_ => Err(self.invalid_state(operation)),
		}
	}

	fn require(&self, operation: &'static str, allowed: &[CalcerState]) -> Result<(), Error> {
		if allowed.contains(&self.state) {
			Ok(())
		} else {
			Err(self.invalid_state(operation))
		}
	}

	fn invalid_state(&self, operation: &'static str) -> Error {
		Error::InvalidState {
			operation,
			state: self.state.name(),
		}
	}
}

impl<'a> Drop for MetricsPlotCalcer<'a> {
	fn drop(&mut self) {
		if let Err(error) = self.clear_temp_files() {
			tracing::warn!(%error, "failed to remove temporary files");
		}
	}
}

fn block_input<'b>(approx: ArrayView2<'b, f64>, block: &'b DataBlock) -> MetricInput<'b> {
	MetricInput {
		approx,
		target: &block.target,
		weights: block.weights.as_deref(),
		query_ids: block.query_ids.as_deref(),
	}
}

fn concat_labels(labels: Vec<BlockLabels>) -> BlockLabels {
	let has_weights = labels.iter().any(|labels| labels.weights.is_some());
	let has_query_ids = labels.iter().all(|labels| labels.query_ids.is_some()) && !labels.is_empty();
	let mut concatenated = BlockLabels {
		target: Vec::new(),
		weights: if has_weights { Some(Vec::new()) } else { None },
		query_ids: if has_query_ids { Some(Vec::new()) } else { None },
	};
	for block in labels {
		let n_documents = block.target.len();
		concatenated.target.extend(block.target);
		if let Some(weights) = concatenated.weights.as_mut() {
			weights.extend(block.weights.unwrap_or_else(|| vec![1.0; n_documents]));
		}
		if let (Some(query_ids), Some(block_query_ids)) =
			(concatenated.query_ids.as_mut(), block.query_ids)
		{
			query_ids.extend(block_query_ids);
		}
	}
	concatenated
}

fn concat_approxes(approx_dimension: usize, approxes: &[Array2<f64>]) -> Result<Array2<f64>, Error> {
	if approxes.is_empty() {
		return Ok(Array2::zeros((approx_dimension, 0)));
	}
	let views: Vec<ArrayView2<f64>> = approxes.iter().map(|approx| approx.view()).collect();
	ndarray::concatenate(Axis(1), &views).map_err(|error| {
		Error::DataShape(format!("failed to concatenate saved approxes: {}", error))
	})
}

#[cfg(test)]
fn test_blocks() -> Vec<DataBlock> {
	vec![
		DataBlock::new(0, arr2(&[[-2.0], [0.5]]), vec![0.0, 1.0], None, None).unwrap(),
		DataBlock::new(
			2,
			arr2(&[[3.0], [-0.5], [1.5]]),
			vec![1.0, 0.0, 1.0],
			Some(vec![1.0, 2.0, 1.0]),
			None,
		)
		.unwrap(),
	]
}

#[cfg(test)]
fn test_settings(processed_iterations_step: usize, tmp_dir: Option<&Path>) -> PlotSettings {
	PlotSettings {
		first_iteration: 0,
		end_iteration: 0,
		step: 1,
		processed_iterations_step,
		tmp_dir: tmp_dir.map(Path::to_owned),
	}
}

#[test]
fn test_save_result_once() {
	let ensemble = super::approx::test_ensemble("Logloss", 0.5);
	let metrics = MetricSet::from_description("Logloss,AUC", 1).unwrap();
	let pool = WorkerPool::new(2).unwrap();
	let blocks = test_blocks();
	let result_dir = tempfile::tempdir().unwrap();
	let mut calcer = MetricsPlotCalcer::new(&ensemble, &metrics, &pool, test_settings(50, None)).unwrap();
	assert!(matches!(
		calcer.save_result(result_dir.path(), false),
		Err(Error::InvalidState { .. })
	));
	// Non-additive metrics wait for the additive pass.
	assert!(matches!(
		calcer.compute_non_additive_metrics(&blocks),
		Err(Error::InvalidState { .. })
	));
	for block in blocks.iter() {
		calcer.proceed_dataset_for_additive_metrics(block).unwrap();
	}
	calcer.finish_proceed_dataset_for_additive_metrics().unwrap();
	assert_eq!(calcer.state(), CalcerState::AdditiveDataLoaded);
	assert!(calcer.result_table().is_none());
	calcer.compute_non_additive_metrics(&blocks).unwrap();
	assert_eq!(calcer.state(), CalcerState::Finalized);
	assert_eq!(calcer.result_table().unwrap().iterations, vec![0, 1, 2]);
	calcer.save_result(result_dir.path(), false).unwrap();
	assert_eq!(calcer.state(), CalcerState::Saved);
	assert!(matches!(
		calcer.save_result(result_dir.path(), false),
		Err(Error::InvalidState { .. })
	));
	calcer.clear_temp_files().unwrap();
	calcer.clear_temp_files().unwrap();
}

#[test]
fn test_checkpoint_zero_is_neutral() {
	let ensemble = super::approx::test_ensemble("RMSE", 1.0);
	let metrics = MetricSet::from_description("RMSE:use_weights=false", 1).unwrap();
	let pool = WorkerPool::new(2).unwrap();
	let mut calcer = MetricsPlotCalcer::new(&ensemble, &metrics, &pool, test_settings(50, None)).unwrap();
	for block in test_blocks().iter() {
		calcer.proceed_dataset_for_additive_metrics(block).unwrap();
	}
	calcer.finish_proceed_dataset_for_additive_metrics().unwrap();
	assert_eq!(calcer.state(), CalcerState::Finalized);
	let values = calcer.result_table().unwrap().metric_values("RMSE:use_weights=false").unwrap();
	// Three of the five targets are 1.
	assert!((values[0] - (3.0f64 / 5.0).sqrt()).abs() < 1e-12);
}

#[test]
fn test_parts_match_whole() {
	let ensemble = super::approx::test_ensemble("Logloss", 0.5);
	let metrics = MetricSet::from_description("AUC,NormalizedGini,Logloss", 1).unwrap();
	let pool = WorkerPool::new(2).unwrap();
	let blocks = test_blocks();
	let mut whole = MetricsPlotCalcer::new(&ensemble, &metrics, &pool, test_settings(50, None)).unwrap();
	for block in blocks.iter() {
		whole.proceed_dataset_for_additive_metrics(block).unwrap();
	}
	whole.finish_proceed_dataset_for_additive_metrics().unwrap();
	whole.compute_non_additive_metrics(&blocks).unwrap();
	let whole = whole.result_table().unwrap().clone();
	for (processed_iterations_step, expected_n_passes) in [(1, 3), (2, 2), (50, 1)].iter() {
		let tmp_dir = tempfile::tempdir().unwrap();
		let mut parts = MetricsPlotCalcer::new(
			&ensemble,
			&metrics,
			&pool,
			test_settings(*processed_iterations_step, Some(tmp_dir.path())),
		)
		.unwrap();
		for block in blocks.iter() {
			parts.proceed_dataset_for_additive_metrics(block).unwrap();
		}
		parts.finish_proceed_dataset_for_additive_metrics().unwrap();
		let mut n_passes = 0;
		while !parts.are_all_iterations_processed() {
			for block in blocks.iter() {
				parts.proceed_dataset_for_non_additive_metrics(block).unwrap();
			}
			parts.finish_proceed_dataset_for_non_additive_metrics().unwrap();
			n_passes += 1;
		}
		assert_eq!(n_passes, *expected_n_passes);
		assert_eq!(parts.state(), CalcerState::Finalized);
		let result = parts.result_table().unwrap();
		for (a, b) in result.values.iter().flatten().zip(whole.values.iter().flatten()) {
			assert!((a - b).abs() < 1e-12);
		}
		assert_eq!(std::fs::read_dir(tmp_dir.path()).unwrap().count(), 1);
		parts.clear_temp_files().unwrap();
		assert_eq!(std::fs::read_dir(tmp_dir.path()).unwrap().count(), 0);
	}
}

#[test]
fn test_parts_reject_changed_blocks() {
	let ensemble = super::approx::test_ensemble("RMSE", 1.0);
	let metrics = MetricSet::from_description("AUC", 1).unwrap();
	let pool = WorkerPool::new(1).unwrap();
	let blocks = test_blocks();
	let mut calcer = MetricsPlotCalcer::new(&ensemble, &metrics, &pool, test_settings(1, None)).unwrap();
	for block in blocks.iter() {
		calcer.proceed_dataset_for_non_additive_metrics(block).unwrap();
	}
	calcer.finish_proceed_dataset_for_non_additive_metrics().unwrap();
	calcer.proceed_dataset_for_non_additive_metrics(&blocks[0]).unwrap();
	assert!(matches!(
		calcer.finish_proceed_dataset_for_non_additive_metrics(),
		Err(Error::DataShape(_))
	));
}

#[test]
fn test_invalid_settings() {
	let ensemble = super::approx::test_ensemble("RMSE", 1.0);
	let metrics = MetricSet::from_description("RMSE", 1).unwrap();
	let pool = WorkerPool::new(1).unwrap();
	let settings = |first_iteration, end_iteration, step| PlotSettings {
		first_iteration,
		end_iteration,
		step,
		..test_settings(50, None)
	};
	for (first_iteration, end_iteration, step) in [(2, 2, 1), (3, 0, 1), (0, 4, 1), (0, 3, 0)].iter() {
		let result = MetricsPlotCalcer::new(
			&ensemble,
			&metrics,
			&pool,
			settings(*first_iteration, *end_iteration, *step),
		);
		assert!(matches!(result, Err(Error::Configuration(_))));
	}
	let calcer = MetricsPlotCalcer::new(&ensemble, &metrics, &pool, settings(1, 3, 1)).unwrap();
	assert_eq!(calcer.iterations(), &[1, 2]);
}

#[test]
fn test_blocks_without_model_features_are_rejected() {
	let ensemble = super::approx::test_ensemble("RMSE", 1.0);
	let metrics = MetricSet::from_description("RMSE,AUC", 1).unwrap();
	let pool = WorkerPool::new(2).unwrap();
	let narrow = vec![DataBlock::new(0, Array2::zeros((2, 0)), vec![0.0, 1.0], None, None).unwrap()];
	let mut calcer = MetricsPlotCalcer::new(&ensemble, &metrics, &pool, test_settings(50, None)).unwrap();
	assert!(matches!(
		calcer.proceed_dataset_for_additive_metrics(&narrow[0]),
		Err(Error::DataShape(_))
	));
	let metrics = MetricSet::from_description("AUC", 1).unwrap();
	let mut calcer = MetricsPlotCalcer::new(&ensemble, &metrics, &pool, test_settings(1, None)).unwrap();
	assert!(matches!(
		calcer.proceed_dataset_for_non_additive_metrics(&narrow[0]),
		Err(Error::DataShape(_))
	));
	let mut calcer = MetricsPlotCalcer::new(&ensemble, &metrics, &pool, test_settings(50, None)).unwrap();
	assert!(matches!(
		calcer.compute_non_additive_metrics(&narrow),
		Err(Error::DataShape(_))
	));
}
