use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

/**
A `WorkerPool` is a fixed-size pool of threads that all document-level loops of one evaluation run execute on. It is constructed explicitly and passed by reference to whatever needs it, so two runs in one process never share threads by accident.
*/
pub struct WorkerPool {
	pool: ThreadPool,
}

#[derive(Debug, Error)]
#[error("failed to start a worker pool with {n_threads} threads")]
pub struct WorkerPoolError {
	n_threads: usize,
	#[source]
	source: ThreadPoolBuildError,
}

impl WorkerPool {
	/// Create a pool with `n_threads` threads. A value of zero is treated as one.
	pub fn new(n_threads: usize) -> Result<WorkerPool, WorkerPoolError> {
		let n_threads = n_threads.max(1);
		let pool = ThreadPoolBuilder::new()
			.num_threads(n_threads)
			.thread_name(|index| format!("gbeval-worker-{}", index))
			.build()
			.map_err(|source| WorkerPoolError { n_threads, source })?;
		Ok(WorkerPool { pool })
	}

	pub fn n_threads(&self) -> usize {
		self.pool.current_num_threads()
	}

	/// Run `f` inside the pool. Any rayon parallel iterators used by `f` execute on this pool's threads and this call blocks until they have all completed.
	pub fn install<F, R>(&self, f: F) -> R
	where
		F: FnOnce() -> R + Send,
		R: Send,
	{
		self.pool.install(f)
	}
}

impl std::fmt::Debug for WorkerPool {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkerPool")
			.field("n_threads", &self.n_threads())
			.finish()
	}
}

#[test]
fn test_worker_pool_size() {
	let pool = WorkerPool::new(3).unwrap();
	assert_eq!(pool.n_threads(), 3);
	let pool = WorkerPool::new(0).unwrap();
	assert_eq!(pool.n_threads(), 1);
}

#[test]
fn test_install_runs_parallel_iterators() {
	use rayon::prelude::*;
	let pool = WorkerPool::new(2).unwrap();
	let mut values = vec![1, 2, 3, 4];
	pool.install(|| values.par_iter_mut().for_each(|value| *value *= 2));
	assert_eq!(values, vec![2, 4, 6, 8]);
}
