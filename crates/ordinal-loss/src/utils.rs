//! Parallelism configuration shared by the forward and backward passes.

/// Whether row-parallel execution is allowed.
///
/// When `Parallel`, the engine processes sample rows on the current `rayon`
/// pool. Results are identical in both modes: per-row losses are always
/// reduced in row order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }
}

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use the global pool)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// # Errors
///
/// Returns the pool build error if a dedicated pool cannot be created.
pub fn run_with_threads<T: Send>(
    n_threads: usize,
    f: impl FnOnce(Parallelism) -> T + Send,
) -> Result<T, rayon::ThreadPoolBuildError> {
    match Parallelism::from_threads(n_threads) {
        Parallelism::Sequential => Ok(f(Parallelism::Sequential)),
        Parallelism::Parallel if n_threads == 0 => Ok(f(Parallelism::Parallel)),
        Parallelism::Parallel => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()?;
            Ok(pool.install(|| f(Parallelism::Parallel)))
        }
    }
}
