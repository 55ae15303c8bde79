//! Runtime configuration for softmax reductions
//!
//! Every knob has a default and can be overridden either with the builder
//! methods on [`SoftmaxConfig`] or through environment variables read by
//! [`SoftmaxConfig::from_env`]:
//!
//! | Variable | Values | Field |
//! |----------|--------|-------|
//! | `ONLINE_SOFTMAX` | `1`/`0`, `true`/`false`, `on`/`off` | `online_softmax` |
//! | `ONLINE_SOFTMAX_BLOCK` | integer ≥ 1 | `block_size` |
//! | `ONLINE_SOFTMAX_PERSISTENT_THRESHOLD` | integer | `persistent_threshold` |
//! | `ONLINE_SOFTMAX_SPLIT` | `unsplit`, `combine` | `split_policy` |
//! | `ONLINE_SOFTMAX_ACCUMULATION` | `f32`, `f64` | `accumulation` |
//! | `ONLINE_SOFTMAX_THREADS` | integer ≥ 1 | `num_threads` |

use crate::dtype::AccumulationPrecision;
use crate::error::{Error, Result};
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

/// Enables or disables the fused max/sum pass
pub const ONLINE_SOFTMAX_ENV: &str = "ONLINE_SOFTMAX";
/// Lanes per block in the looped online kernel
pub const ONLINE_SOFTMAX_BLOCK_ENV: &str = "ONLINE_SOFTMAX_BLOCK";
/// Largest reduction handled without a reduction loop
pub const ONLINE_SOFTMAX_PERSISTENT_THRESHOLD_ENV: &str = "ONLINE_SOFTMAX_PERSISTENT_THRESHOLD";
/// What to do when splitting the reduction looks profitable
pub const ONLINE_SOFTMAX_SPLIT_ENV: &str = "ONLINE_SOFTMAX_SPLIT";
/// Precision of the running statistics
pub const ONLINE_SOFTMAX_ACCUMULATION_ENV: &str = "ONLINE_SOFTMAX_ACCUMULATION";
/// Size of a dedicated worker pool
pub const ONLINE_SOFTMAX_THREADS_ENV: &str = "ONLINE_SOFTMAX_THREADS";

/// Handling of reductions long enough that splitting them across workers
/// looks profitable
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SplitPolicy {
    /// Keep the single-pass online reduction unsplit; trades some parallelism
    /// for one kernel per row
    #[default]
    Unsplit,
    /// Cut the row into chunks, accumulate them in parallel, and combine the
    /// partial statistics
    Combine,
}

impl FromStr for SplitPolicy {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unsplit" | "fallback" | "none" | "" => Ok(Self::Unsplit),
            "combine" | "split" => Ok(Self::Combine),
            other => Err(Error::invalid_argument(
                "split_policy",
                format!("unknown policy '{other}'"),
            )),
        }
    }
}

/// Tuning knobs for the softmax planner and CPU kernels
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoftmaxConfig {
    /// Fuse the max and sum passes; when false the three-pass form is used
    pub online_softmax: bool,
    /// Reductions of at most this many elements load the whole row at once
    pub persistent_threshold: usize,
    /// Independent lanes per block in looped reductions
    pub block_size: usize,
    /// Behaviour when a split reduction looks profitable
    pub split_policy: SplitPolicy,
    /// Smallest reduction size for which a split is considered
    pub split_min_size: usize,
    /// A split is considered only with fewer rows than this
    pub split_max_rows: usize,
    /// Minimum precision of the running statistics; f64 inputs always use f64
    pub accumulation: AccumulationPrecision,
    /// Dedicated worker pool size; `None` uses the global rayon pool
    pub num_threads: Option<usize>,
    /// Minimum rows handed to one parallel task
    pub parallel_min_len: usize,
}

impl Default for SoftmaxConfig {
    fn default() -> Self {
        Self {
            online_softmax: true,
            persistent_threshold: 1024,
            block_size: 1024,
            split_policy: SplitPolicy::Unsplit,
            split_min_size: 1 << 16,
            split_max_rows: 8,
            accumulation: AccumulationPrecision::F32,
            num_threads: None,
            parallel_min_len: 4,
        }
    }
}

impl SoftmaxConfig {
    /// Enable or disable the fused max/sum pass
    pub fn with_online_softmax(mut self, enabled: bool) -> Self {
        self.online_softmax = enabled;
        self
    }

    /// Set the persistent-reduction threshold
    pub fn with_persistent_threshold(mut self, threshold: usize) -> Self {
        self.persistent_threshold = threshold;
        self
    }

    /// Set the number of lanes per block
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the split policy
    pub fn with_split_policy(mut self, policy: SplitPolicy) -> Self {
        self.split_policy = policy;
        self
    }

    /// Set when a split is considered profitable
    pub fn with_split_thresholds(mut self, min_size: usize, max_rows: usize) -> Self {
        self.split_min_size = min_size;
        self.split_max_rows = max_rows;
        self
    }

    /// Set the accumulation precision
    pub fn with_accumulation(mut self, accumulation: AccumulationPrecision) -> Self {
        self.accumulation = accumulation;
        self
    }

    /// Run on a dedicated pool of `n` threads
    pub fn with_num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Set the minimum number of rows handed to one parallel task
    pub fn with_parallel_min_len(mut self, rows: usize) -> Self {
        self.parallel_min_len = rows;
        self
    }

    /// Check that every knob is usable
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::invalid_argument("block_size", "must be at least 1"));
        }
        if self.split_min_size == 0 {
            return Err(Error::invalid_argument(
                "split_min_size",
                "must be at least 1",
            ));
        }
        if self.num_threads == Some(0) {
            return Err(Error::invalid_argument("num_threads", "must be at least 1"));
        }
        if self.parallel_min_len == 0 {
            return Err(Error::invalid_argument(
                "parallel_min_len",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Defaults overridden by any `ONLINE_SOFTMAX*` environment variables.
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with a caller-supplied variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ONLINE_SOFTMAX_ENV) {
            match parse_flag(&raw) {
                Some(enabled) => config.online_softmax = enabled,
                None => warn_ignored(ONLINE_SOFTMAX_ENV, &raw),
            }
        }
        if let Some(raw) = lookup(ONLINE_SOFTMAX_BLOCK_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.block_size = n,
                _ => warn_ignored(ONLINE_SOFTMAX_BLOCK_ENV, &raw),
            }
        }
        if let Some(raw) = lookup(ONLINE_SOFTMAX_PERSISTENT_THRESHOLD_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(n) => config.persistent_threshold = n,
                Err(_) => warn_ignored(ONLINE_SOFTMAX_PERSISTENT_THRESHOLD_ENV, &raw),
            }
        }
        if let Some(raw) = lookup(ONLINE_SOFTMAX_SPLIT_ENV) {
            match raw.parse::<SplitPolicy>() {
                Ok(policy) => config.split_policy = policy,
                Err(_) => warn_ignored(ONLINE_SOFTMAX_SPLIT_ENV, &raw),
            }
        }
        if let Some(raw) = lookup(ONLINE_SOFTMAX_ACCUMULATION_ENV) {
            match AccumulationPrecision::parse(&raw) {
                Some(precision) => config.accumulation = precision,
                None => warn_ignored(ONLINE_SOFTMAX_ACCUMULATION_ENV, &raw),
            }
        }
        if let Some(raw) = lookup(ONLINE_SOFTMAX_THREADS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.num_threads = Some(n),
                _ => warn_ignored(ONLINE_SOFTMAX_THREADS_ENV, &raw),
            }
        }

        config
    }
}

static PROCESS_CONFIG: OnceLock<SoftmaxConfig> = OnceLock::new();

/// Process-wide configuration, read from the environment on first use
pub fn process_config() -> &'static SoftmaxConfig {
    PROCESS_CONFIG.get_or_init(SoftmaxConfig::from_env)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn warn_ignored(var: &str, raw: &str) {
    tracing::warn!(var, value = raw, "ignoring unparsable softmax configuration value");
}
