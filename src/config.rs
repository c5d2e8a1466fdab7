use crate::error::{Error, Result};
use crate::schedule::Schedule;
use crate::ThreadPoolDescriptor;

/// Default matrix size.
pub const N: usize = 729;
/// Default number of repetitions of each kernel.
pub const REPS: usize = 100;

/// Name of the environment variable the team size is read from.
pub const THREADS_ENV: &str = "OMP_NUM_THREADS";

/// Describes one benchmark run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of rows and columns of the matrices. Default: 729.
    pub size: usize,
    /// How often each kernel is repeated inside the timed section. Default: 100.
    pub reps: usize,
    /// Execution units of the team. Default: number of logical CPUs.
    pub num_threads: usize,
    /// Scheduling policy for both kernels. Default: static even split.
    pub schedule: Schedule,
    /// The stack size of the worker threads. Default: 2 MiB.
    pub stack_size: usize,
    /// Name prefix of the worker threads. Default: "Loop team".
    pub thread_name: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let pool = ThreadPoolDescriptor::default();
        Self {
            size: N,
            reps: REPS,
            num_threads: num_cpus::get(),
            schedule: Schedule::default(),
            stack_size: pool.stack_size,
            thread_name: pool.thread_name,
        }
    }
}

impl BenchConfig {
    /// The default configuration with team size and schedule taken from `OMP_NUM_THREADS` and
    /// `OMP_SCHEDULE`. Unusable values are reported and replaced by the defaults.
    pub fn from_env() -> Self {
        let num_threads = match std::env::var(THREADS_ENV) {
            Ok(value) => parse_threads(&value).unwrap_or_else(|| {
                tracing::warn!(%value, "ignoring {}", THREADS_ENV);
                num_cpus::get()
            }),
            Err(_) => num_cpus::get(),
        };

        Self {
            num_threads,
            schedule: Schedule::from_env(),
            ..Default::default()
        }
    }

    /// Checks that the configuration describes a runnable benchmark.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::config("size must be > 0"));
        }
        if self.reps == 0 {
            return Err(Error::config("reps must be > 0"));
        }
        if self.num_threads == 0 {
            return Err(Error::config("num_threads must be > 0"));
        }
        Ok(())
    }

    /// The thread pool this run needs.
    pub fn pool_descriptor(&self) -> ThreadPoolDescriptor {
        ThreadPoolDescriptor {
            num_threads: self.num_threads,
            stack_size: self.stack_size,
            thread_name: self.thread_name.clone(),
        }
    }
}

/// Reads a team size. Only the first entry of a nested list like "8,4" applies here.
fn parse_threads(value: &str) -> Option<usize> {
    let first = value.split(',').next()?.trim();
    first.parse().ok().filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.size, 729);
        assert_eq!(config.reps, 100);
        assert!(config.num_threads >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        for config in [
            BenchConfig {
                size: 0,
                ..Default::default()
            },
            BenchConfig {
                reps: 0,
                ..Default::default()
            },
            BenchConfig {
                num_threads: 0,
                ..Default::default()
            },
        ]
        .iter()
        {
            assert!(matches!(config.validate(), Err(Error::Config(_))));
        }
    }

    #[test]
    fn test_parse_threads() {
        assert_eq!(parse_threads("4"), Some(4));
        assert_eq!(parse_threads(" 8 ,2"), Some(8));
        assert_eq!(parse_threads("0"), None);
        assert_eq!(parse_threads("many"), None);
        assert_eq!(parse_threads(""), None);
    }

    #[test]
    fn test_pool_descriptor() {
        let config = BenchConfig {
            num_threads: 3,
            ..Default::default()
        };
        let descriptor = config.pool_descriptor();
        assert_eq!(descriptor.num_threads, 3);
        assert_eq!(descriptor.thread_name, "Loop team");
    }
}
