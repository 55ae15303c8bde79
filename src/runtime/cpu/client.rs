//! CPU client: configuration, planning, and worker pool

use crate::config::{SoftmaxConfig, process_config};
use crate::dtype::{AccumulationPrecision, DType};
use crate::error::Result;
use crate::ops::plan::{ReductionPlan, plan_reduction};
use crate::tensor::ReduceLayout;
#[cfg(feature = "rayon")]
use std::sync::Arc;

/// CPU client for softmax operation dispatch
///
/// Owns the configuration every call is planned with and, when
/// `num_threads` is set, a dedicated rayon pool the kernels run on.
#[derive(Clone, Debug)]
pub struct CpuClient {
    config: SoftmaxConfig,
    #[cfg(feature = "rayon")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl CpuClient {
    /// Create a client with an explicit configuration
    pub fn new(config: SoftmaxConfig) -> Result<Self> {
        config.validate()?;

        #[cfg(feature = "rayon")]
        let pool = match config.num_threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("online-softmax-{i}"))
                    .build()?;
                Some(Arc::new(pool))
            }
            None => None,
        };

        Ok(Self {
            config,
            #[cfg(feature = "rayon")]
            pool,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &SoftmaxConfig {
        &self.config
    }

    /// Plan the reduction of a tensor of `shape` along `dim` without running it
    pub fn plan(&self, shape: &[usize], dim: isize) -> Result<ReductionPlan> {
        let layout = ReduceLayout::new(shape, dim, "plan")?;
        Ok(plan_reduction(&layout, &self.config))
    }

    /// Precision the statistics of a `dtype` input are accumulated in
    pub(crate) fn accumulation_for(&self, dtype: DType) -> AccumulationPrecision {
        self.config.accumulation.at_least(dtype)
    }

    /// Minimum rows per parallel task
    #[cfg_attr(not(feature = "rayon"), allow(dead_code))]
    pub(crate) fn parallel_min_len(&self) -> usize {
        self.config.parallel_min_len
    }

    /// Run `f` on the dedicated pool if there is one
    #[cfg(feature = "rayon")]
    pub(crate) fn install_parallelism<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

impl Default for CpuClient {
    /// Client using the process-wide configuration.
    ///
    /// A pool that fails to start degrades to the global rayon pool.
    fn default() -> Self {
        let config = process_config().clone();
        match Self::new(config.clone()) {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(%err, "falling back to the global worker pool");
                Self {
                    config: SoftmaxConfig {
                        num_threads: None,
                        ..config
                    },
                    #[cfg(feature = "rayon")]
                    pool: None,
                }
            }
        }
    }
}
