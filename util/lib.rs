/*!
This crate contains utilities shared by the other `gbeval` crates: the [`WorkerPool`](struct.WorkerPool.html) handle that every parallel loop runs on, the `pzip!` macro, and logging setup for binaries.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod logging;
mod thread_pool;

pub use self::thread_pool::{WorkerPool, WorkerPoolError};

/// Zip any number of parallel iterables into a single parallel iterator of tuples.
#[macro_export]
macro_rules! pzip {
	($($e:expr),* $(,)*) => {
		rayon::iter::IntoParallelIterator::into_par_iter(($($e,)*))
	};
}
