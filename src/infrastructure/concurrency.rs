/// Thread pool setup for parsing, resolution and rule evaluation.
use anyhow::Result;
use tracing::info;

/// Number of rayon workers: the requested count, or half the cores so an
/// editor running alongside stays responsive. Never less than one.
pub fn worker_count(requested: Option<usize>) -> usize {
    match requested {
        Some(n) => n.max(1),
        None => std::cmp::max(1, num_cpus::get() / 2),
    }
}

/// Initialize the global rayon thread pool. Fails if it was already built.
pub fn init_thread_pool(requested: Option<usize>) -> Result<()> {
    let workers = worker_count(requested);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("durable-lint-{}", i))
        .build_global()?;

    info!(
        "Initialized thread pool: {} workers (system has {} cores)",
        workers,
        num_cpus::get()
    );
    Ok(())
}
