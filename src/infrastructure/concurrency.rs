/// Thread pool setup for batch analysis.
///
/// Each analysis is single-threaded; batch mode runs independent projects
/// side by side and leaves half the machine free for the editor.

use anyhow::{Context, Result};
use tracing::info;

/// Worker count for a machine with `cores` logical CPUs, minimum 1.
pub fn worker_count(cores: usize) -> usize {
    std::cmp::max(1, cores / 2)
}

/// Initialize the global rayon thread pool.
pub fn init_thread_pool() -> Result<usize> {
    let cores = num_cpus::get();
    let workers = worker_count(cores);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("beatcoach-worker-{i}"))
        .build_global()
        .context("Failed to initialize the global thread pool")?;

    info!(workers, cores, "initialized thread pool");
    Ok(workers)
}
