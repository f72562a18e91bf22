use gbeval_core::{eval_metrics, Error, EvalMetricsOptions, ResultTable};
use gbeval_dataframe::ColumnType;
use gbeval_tree::{
	BranchNode, BranchSplit, BranchSplitContinuous, BranchSplitDiscrete, Ensemble, LeafNode,
	ModelFormat, Node, SplitDirection, Tree,
};
use gbeval_util::WorkerPool;
use std::path::Path;

fn stump(feature_index: usize, split_value: f32, left: f64, right: f64) -> Tree {
	Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 1,
				right_child_index: 2,
				split: BranchSplit::Continuous(BranchSplitContinuous {
					feature_index,
					split_value,
					invalid_values_direction: SplitDirection::Left,
				}),
			}),
			Node::Leaf(LeafNode { values: vec![left] }),
			Node::Leaf(LeafNode { values: vec![right] }),
		],
	}
}

/// An ensemble of stumps on two numeric features whose splits and leaf values vary from tree to tree.
fn stump_ensemble(loss_function: &str, n_trees: usize) -> Ensemble {
	let trees = (0..n_trees)
		.map(|tree_index| {
			let feature_index = tree_index % 2;
			let split_value = (tree_index % 10) as f32 / 10.0;
			let left = -0.01 * ((tree_index % 3) as f64 + 1.0);
			let right = 0.02 * ((tree_index % 5) as f64 + 1.0);
			stump(feature_index, split_value, left, right)
		})
		.collect();
	Ensemble {
		loss_function: loss_function.to_owned(),
		approx_dimension: 1,
		learning_rate: 0.3,
		features: vec![ColumnType::Number, ColumnType::Number],
		class_names: vec![],
		trees,
	}
}

fn write_model(dir: &Path, ensemble: &Ensemble) -> std::path::PathBuf {
	let path = dir.join("model.json");
	ensemble.to_path(&path, ModelFormat::Json).unwrap();
	path
}

/// Write a tab separated dataset with the label in the first column.
fn write_dataset(dir: &Path, rows: &[(f32, f32, f32)]) -> std::path::PathBuf {
	let path = dir.join("test.tsv");
	let text: String = rows
		.iter()
		.map(|(label, a, b)| format!("{}\t{}\t{}\n", label, a, b))
		.collect();
	std::fs::write(&path, text).unwrap();
	path
}

fn generated_rows(n_rows: usize) -> Vec<(f32, f32, f32)> {
	(0..n_rows)
		.map(|index| {
			let a = ((index * 37) % 100) as f32 / 100.0;
			let b = ((index * 53) % 100) as f32 / 100.0;
			let label = if (index * 7) % 3 == 0 { 1.0 } else { 0.0 };
			(label, a, b)
		})
		.collect()
}

fn assert_close(a: &ResultTable, b: &ResultTable) {
	assert_eq!(a.iterations, b.iterations);
	assert_eq!(a.metric_descriptions, b.metric_descriptions);
	for (a, b) in a.values.iter().flatten().zip(b.values.iter().flatten()) {
		assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
	}
}

#[test]
fn test_hundred_trees_three_documents() {
	let dir = tempfile::tempdir().unwrap();
	let model_path = write_model(dir.path(), &stump_ensemble("RMSE", 100));
	let input_path = write_dataset(dir.path(), &[(0.0, 0.15, 0.6), (1.0, 0.45, 0.2), (1.0, 0.95, 0.85)]);
	let result_dir = dir.path().join("result");
	let options = EvalMetricsOptions {
		step: 10,
		end_iteration: 100,
		result_dir: result_dir.clone(),
		..EvalMetricsOptions::new(&model_path, &input_path, "RMSE,AUC")
	};
	let pool = WorkerPool::new(2).unwrap();
	let result = eval_metrics(&options, &pool).unwrap();
	assert_eq!(result.iterations, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90]);
	assert_eq!(result.metric_descriptions, vec!["RMSE", "AUC"]);
	assert!(result.values.iter().flatten().all(|value| value.is_finite()));
	// At checkpoint 0 the approx is 0 for every document.
	let rmse = result.metric_values("RMSE").unwrap();
	assert!((rmse[0] - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
	// Every prediction is tied at checkpoint 0.
	assert_eq!(result.metric_values("AUC").unwrap()[0], 0.5);
	let metrics = std::fs::read_to_string(result_dir.join("metrics.tsv")).unwrap();
	let lines: Vec<&str> = metrics.lines().collect();
	assert_eq!(lines.len(), 11);
	assert_eq!(lines[0], "iteration\tRMSE\tAUC");
	assert!(lines[2].starts_with("10\t"));
}

#[test]
fn test_block_size_invariance() {
	let dir = tempfile::tempdir().unwrap();
	let model_path = write_model(dir.path(), &stump_ensemble("Logloss", 30));
	let input_path = write_dataset(dir.path(), &generated_rows(97));
	let pool = WorkerPool::new(3).unwrap();
	let run = |block_size: usize| {
		let options = EvalMetricsOptions {
			block_size,
			step: 3,
			result_dir: dir.path().join(format!("result_{}", block_size)),
			..EvalMetricsOptions::new(&model_path, &input_path, "Logloss,RMSE,Accuracy,AUC")
		};
		eval_metrics(&options, &pool).unwrap()
	};
	let whole = run(1000);
	assert_eq!(whole.n_checkpoints(), 10);
	for block_size in [1, 7, 50].iter() {
		assert_close(&run(*block_size), &whole);
	}
}

#[test]
fn test_calc_on_parts_matches_calc_on_whole() {
	let dir = tempfile::tempdir().unwrap();
	let model_path = write_model(dir.path(), &stump_ensemble("Logloss", 40));
	let input_path = write_dataset(dir.path(), &generated_rows(60));
	let tmp_dir = dir.path().join("tmp");
	let pool = WorkerPool::new(2).unwrap();
	let run = |calc_on_parts: bool, processed_iterations_step: usize| {
		let options = EvalMetricsOptions {
			block_size: 16,
			step: 4,
			calc_on_parts,
			processed_iterations_step,
			tmp_dir: tmp_dir.to_str().unwrap().to_owned(),
			result_dir: dir.path().join("result"),
			..EvalMetricsOptions::new(&model_path, &input_path, "AUC,Logloss,NormalizedGini")
		};
		eval_metrics(&options, &pool).unwrap()
	};
	let whole = run(false, 50);
	// Ten checkpoints in batches of three take four passes.
	assert_close(&run(true, 3), &whole);
	assert_close(&run(true, 50), &whole);
	assert_eq!(std::fs::read_dir(&tmp_dir).unwrap().count(), 0);
}

#[test]
fn test_non_additive_only_calc_on_whole() {
	let dir = tempfile::tempdir().unwrap();
	let model_path = write_model(dir.path(), &stump_ensemble("RMSE", 12));
	let input_path = write_dataset(dir.path(), &generated_rows(25));
	let pool = WorkerPool::new(2).unwrap();
	let options = EvalMetricsOptions {
		block_size: 4,
		result_dir: dir.path().join("result"),
		..EvalMetricsOptions::new(&model_path, &input_path, "AUC")
	};
	let whole = eval_metrics(&options, &pool).unwrap();
	let parts = eval_metrics(
		&EvalMetricsOptions {
			calc_on_parts: true,
			processed_iterations_step: 5,
			..options.clone()
		},
		&pool,
	)
	.unwrap();
	assert_eq!(whole.n_checkpoints(), 12);
	assert_close(&parts, &whole);
}

#[test]
fn test_save_stats() {
	let dir = tempfile::tempdir().unwrap();
	let model_path = write_model(dir.path(), &stump_ensemble("RMSE", 4));
	let input_path = write_dataset(dir.path(), &generated_rows(10));
	let result_dir = dir.path().join("result");
	let options = EvalMetricsOptions {
		save_stats: true,
		result_dir: result_dir.clone(),
		..EvalMetricsOptions::new(&model_path, &input_path, "Quantile:alpha=0.3,MAE")
	};
	let pool = WorkerPool::new(1).unwrap();
	eval_metrics(&options, &pool).unwrap();
	assert!(result_dir.join("metrics.tsv").exists());
	assert!(result_dir.join("MAE_stats.tsv").exists());
	let stats = std::fs::read_to_string(result_dir.join("Quantile_alpha_0.3_stats.tsv")).unwrap();
	let lines: Vec<&str> = stats.lines().collect();
	assert_eq!(lines.len(), 5);
	assert_eq!(lines[0], "iteration\terror\tweight");
	assert!(lines[1].starts_with("0\t") && lines[1].ends_with("\t10"));
}

#[test]
fn test_categorical_model_requires_column_description() {
	let dir = tempfile::tempdir().unwrap();
	let color_tree = Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 1,
				right_child_index: 2,
				split: BranchSplit::Discrete(BranchSplitDiscrete {
					feature_index: 0,
					directions: vec![SplitDirection::Left, SplitDirection::Right, SplitDirection::Left],
				}),
			}),
			Node::Leaf(LeafNode { values: vec![1.0] }),
			Node::Leaf(LeafNode { values: vec![2.0] }),
		],
	};
	let ensemble = Ensemble {
		loss_function: "RMSE".to_owned(),
		approx_dimension: 1,
		learning_rate: 1.0,
		features: vec![ColumnType::Enum {
			options: vec!["red".to_owned(), "blue".to_owned()],
		}],
		class_names: vec![],
		trees: vec![color_tree.clone(), color_tree],
	};
	let model_path = write_model(dir.path(), &ensemble);
	let input_path = dir.path().join("test.tsv");
	std::fs::write(&input_path, "1\tred\n2\tblue\n1\tgreen\n").unwrap();
	let result_dir = dir.path().join("result");
	let pool = WorkerPool::new(1).unwrap();
	let options = EvalMetricsOptions {
		result_dir: result_dir.clone(),
		..EvalMetricsOptions::new(&model_path, &input_path, "RMSE")
	};
	let error = eval_metrics(&options, &pool).unwrap_err();
	assert!(matches!(error, Error::Configuration(_)));
	assert!(!result_dir.exists());
	// With a column description that marks the column categorical the same run succeeds. After the first tree red is at 2 and the others are at 1.
	let column_description_path = dir.path().join("test.cd");
	std::fs::write(&column_description_path, "0\tLabel\n1\tCateg\tcolor\n").unwrap();
	let options = EvalMetricsOptions {
		column_description_path: Some(column_description_path),
		..options
	};
	let result = eval_metrics(&options, &pool).unwrap();
	let rmse = result.metric_values("RMSE").unwrap();
	assert_eq!(rmse.len(), 2);
	assert!((rmse[0] - 2f64.sqrt()).abs() < 1e-12);
	assert!((rmse[1] - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
}

#[test]
fn test_configuration_errors() {
	let dir = tempfile::tempdir().unwrap();
	let model_path = write_model(dir.path(), &stump_ensemble("RMSE", 5));
	let input_path = write_dataset(dir.path(), &generated_rows(5));
	let pool = WorkerPool::new(1).unwrap();
	let options = EvalMetricsOptions {
		result_dir: dir.path().join("result"),
		..EvalMetricsOptions::new(&model_path, &input_path, "")
	};
	assert!(matches!(eval_metrics(&options, &pool), Err(Error::Configuration(_))));
	let options = EvalMetricsOptions {
		metrics: "MultiClass".to_owned(),
		..options
	};
	assert!(matches!(eval_metrics(&options, &pool), Err(Error::Configuration(_))));
	let options = EvalMetricsOptions {
		metrics: "RMSE".to_owned(),
		first_iteration: 5,
		..options
	};
	assert!(matches!(eval_metrics(&options, &pool), Err(Error::Configuration(_))));
	// The end iteration defaults to the number of trees.
	let options = EvalMetricsOptions {
		first_iteration: 0,
		..options
	};
	assert_eq!(eval_metrics(&options, &pool).unwrap().iterations, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_row_shape_error() {
	let dir = tempfile::tempdir().unwrap();
	let model_path = write_model(dir.path(), &stump_ensemble("RMSE", 2));
	let input_path = dir.path().join("test.tsv");
	std::fs::write(&input_path, "1\t0.5\t0.5\n0\t0.1\n").unwrap();
	let pool = WorkerPool::new(1).unwrap();
	let options = EvalMetricsOptions {
		result_dir: dir.path().join("result"),
		..EvalMetricsOptions::new(&model_path, &input_path, "RMSE")
	};
	assert!(matches!(eval_metrics(&options, &pool), Err(Error::DataShape(_))));
}
