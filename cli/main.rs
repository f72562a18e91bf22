//! This module contains the main entrypoint to the gbeval cli.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use gbeval_core::{eval_metrics, EvalMetricsOptions};
use gbeval_tree::ModelFormat;
use gbeval_util::WorkerPool;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
	about = "Evaluate the metrics of a gradient boosted tree ensemble along its trees.",
	disable_help_subcommand = true
)]
enum Options {
	#[command(name = "eval-metrics")]
	EvalMetrics(Box<EvalMetricsArgs>),
}

#[derive(Parser, Debug)]
#[command(about = "evaluate metrics at checkpoints")]
#[command(
	long_about = "compute metrics on a dataset for the model's prediction after every `eval-period` trees"
)]
struct EvalMetricsArgs {
	#[arg(short, long, help = "the path to a yaml or json config file")]
	config: Option<PathBuf>,
	#[arg(short, long, help = "the path to the model file")]
	model: Option<PathBuf>,
	#[arg(long, help = "the format of the model file, json or msgpack")]
	model_format: Option<ModelFormat>,
	#[arg(short, long, help = "the path to the dataset")]
	input: Option<PathBuf>,
	#[arg(long, help = "the path to the column description file")]
	column_description: Option<PathBuf>,
	#[arg(long, help = "the column delimiter of the dataset")]
	delimiter: Option<char>,
	#[arg(long, help = "skip the first line of the dataset")]
	has_header: bool,
	#[arg(long, help = "the first iteration to evaluate")]
	ntree_start: Option<usize>,
	#[arg(long, help = "the iteration to stop before, 0 for the number of trees")]
	ntree_end: Option<usize>,
	#[arg(long, help = "the number of iterations between checkpoints")]
	eval_period: Option<usize>,
	#[arg(long, help = "a comma separated list of metrics, such as Logloss,AUC")]
	metrics: Option<String>,
	#[arg(long, help = "the directory to write results to")]
	result_dir: Option<PathBuf>,
	#[arg(long, help = "the number of rows read at a time")]
	block_size: Option<usize>,
	#[arg(long, help = "the directory for temporary files, - for a fresh one")]
	tmp_dir: Option<String>,
	#[arg(long, help = "compute non-additive metrics in several passes over the dataset")]
	calc_on_parts: bool,
	#[arg(long, help = "the number of checkpoints each calc-on-parts pass handles")]
	processed_iterations_step: Option<usize>,
	#[arg(long, help = "also write the raw error and weight of every metric")]
	save_stats: bool,
	#[arg(short = 'T', long, help = "the number of worker threads")]
	thread_count: Option<usize>,
	#[arg(short, long, help = "log debug messages")]
	verbose: bool,
}

fn main() {
	let options = Options::parse();
	let result = match options {
		Options::EvalMetrics(args) => cli_eval_metrics(*args),
	};
	if let Err(error) = result {
		eprintln!("{}: {:#}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

fn cli_eval_metrics(args: EvalMetricsArgs) -> Result<()> {
	gbeval_util::logging::init(args.verbose)?;
	let options = eval_metrics_options(args)?;
	let pool = WorkerPool::new(options.thread_count)?;
	tracing::info!(
		model = %options.model_path.display(),
		input = %options.input_path.display(),
		metrics = %options.metrics,
		n_threads = pool.n_threads(),
		"evaluating metrics"
	);
	let result = eval_metrics(&options, &pool)?;
	eprintln!(
		"Wrote {} checkpoints of {} metrics to {}.",
		result.n_checkpoints(),
		result.metric_descriptions.len(),
		options.result_dir.display()
	);
	Ok(())
}

/// Start from the config file if one was given, then let each flag that was passed override it.
fn eval_metrics_options(args: EvalMetricsArgs) -> Result<EvalMetricsOptions> {
	let mut options = match args.config.as_deref() {
		Some(config) => EvalMetricsOptions::from_path(config)
			.with_context(|| format!("failed to load config {}", config.display()))?,
		None => {
			let model = args
				.model
				.clone()
				.ok_or_else(|| anyhow!("--model is required without --config"))?;
			let input = args
				.input
				.clone()
				.ok_or_else(|| anyhow!("--input is required without --config"))?;
			let metrics = args
				.metrics
				.clone()
				.ok_or_else(|| anyhow!("--metrics is required without --config"))?;
			EvalMetricsOptions::new(model, input, metrics)
		}
	};
	if let Some(model) = args.model {
		options.model_path = model;
	}
	if let Some(model_format) = args.model_format {
		options.model_format = model_format;
	}
	if let Some(input) = args.input {
		options.input_path = input;
	}
	if let Some(column_description) = args.column_description {
		options.column_description_path = Some(column_description);
	}
	if let Some(delimiter) = args.delimiter {
		options.delimiter = delimiter;
	}
	if args.has_header {
		options.has_header = true;
	}
	if let Some(ntree_start) = args.ntree_start {
		options.first_iteration = ntree_start;
	}
	if let Some(ntree_end) = args.ntree_end {
		options.end_iteration = ntree_end;
	}
	if let Some(eval_period) = args.eval_period {
		options.step = eval_period;
	}
	if let Some(metrics) = args.metrics {
		options.metrics = metrics;
	}
	if let Some(result_dir) = args.result_dir {
		options.result_dir = result_dir;
	}
	if let Some(block_size) = args.block_size {
		options.block_size = block_size;
	}
	if let Some(tmp_dir) = args.tmp_dir {
		options.tmp_dir = tmp_dir;
	}
	if args.calc_on_parts {
		options.calc_on_parts = true;
	}
	if let Some(processed_iterations_step) = args.processed_iterations_step {
		options.processed_iterations_step = processed_iterations_step;
	}
	if args.save_stats {
		options.save_stats = true;
	}
	if let Some(thread_count) = args.thread_count {
		options.thread_count = thread_count;
	}
	Ok(options)
}

#[cfg(test)]
fn parse(args: &[&str]) -> EvalMetricsArgs {
	let mut argv = vec!["gbeval", "eval-metrics"];
	argv.extend_from_slice(args);
	match Options::try_parse_from(argv).unwrap() {
		Options::EvalMetrics(args) => *args,
	}
}

#[test]
fn test_flags_without_config() {
	let options = eval_metrics_options(parse(&[
		"--model",
		"model.json",
		"--input",
		"test.tsv",
		"--metrics",
		"RMSE,AUC",
		"--eval-period",
		"10",
		"--calc-on-parts",
	]))
	.unwrap();
	assert_eq!(options.model_path, PathBuf::from("model.json"));
	assert_eq!(options.metrics, "RMSE,AUC");
	assert_eq!(options.step, 10);
	assert!(options.calc_on_parts);
	assert_eq!(options.block_size, 150_000);
}

#[test]
fn test_missing_required_flag() {
	let error = eval_metrics_options(parse(&["--model", "model.json", "--metrics", "RMSE"]))
		.unwrap_err();
	assert_eq!(error.to_string(), "--input is required without --config");
}

#[test]
fn test_flags_override_config() {
	let dir = tempfile::tempdir().unwrap();
	let config = dir.path().join("config.yaml");
	std::fs::write(
		&config,
		"model_path: model.bin\nmodel_format: msgpack\ninput_path: test.tsv\nmetrics: Logloss\nstep: 5\n",
	)
	.unwrap();
	let config = config.to_str().unwrap();
	let options = eval_metrics_options(parse(&["--config", config, "--metrics", "AUC"])).unwrap();
	assert_eq!(options.model_format, ModelFormat::MessagePack);
	assert_eq!(options.metrics, "AUC");
	assert_eq!(options.step, 5);
}
