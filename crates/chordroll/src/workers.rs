//! Bounded per-file worker pool.
//!
//! Each file runs on the blocking pool under its own timeout. At most
//! `jobs` files are in flight and results come back in input order.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::corpus::CorpusFile;

/// Run `work` once per file, as `(ordinal, file)`.
///
/// A timeout or panic becomes an `Err` with a description for that file
/// only. A timed-out task keeps its blocking thread until it returns, but
/// its result is discarded.
pub async fn map_files<T, F>(
    files: Vec<CorpusFile>,
    jobs: usize,
    timeout: Duration,
    work: F,
) -> Vec<(CorpusFile, Result<T, String>)>
where
    T: Send + 'static,
    F: Fn(u64, &CorpusFile) -> T + Send + Sync + 'static,
{
    let work = Arc::new(work);

    stream::iter(files.into_iter().enumerate())
        .map(|(ordinal, file)| {
            let work = Arc::clone(&work);
            async move {
                let task_file = file.clone();
                let task = tokio::task::spawn_blocking(move || work(ordinal as u64, &task_file));
                let result = match tokio::time::timeout(timeout, task).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(join_error)) => Err(format!("worker panicked: {join_error}")),
                    Err(_) => Err(format!("timed out after {}s", timeout.as_secs_f64())),
                };
                (file, result)
            }
        })
        .buffered(jobs.max(1))
        .collect()
        .await
}
