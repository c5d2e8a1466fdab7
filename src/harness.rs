use std::convert::TryFrom;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::BenchConfig;
use crate::error::Result;
use crate::schedule::Schedule;
use crate::workload::Workload;
use crate::ThreadPool;

/// Calls `f` `reps` times and returns the wall time of the whole sequence.
pub fn time_reps<F>(reps: usize, mut f: F) -> Result<Duration>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    for _ in 0..reps {
        f()?;
    }
    Ok(start.elapsed())
}

/// Checksum and timing of one kernel's repetition sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelReport {
    /// Validator output after the last repetition.
    pub checksum: f64,
    /// Wall time of all repetitions together.
    pub elapsed: Duration,
    /// Number of repetitions.
    pub reps: usize,
}

impl KernelReport {
    /// Average wall time of a single repetition.
    pub fn mean_per_rep(&self) -> Duration {
        match u32::try_from(self.reps) {
            Ok(reps) if reps > 0 => self.elapsed / reps,
            _ => Duration::from_secs_f64(self.elapsed.as_secs_f64() / self.reps.max(1) as f64),
        }
    }
}

/// Everything a run reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Execution units of the team.
    pub threads: usize,
    /// Logical CPUs of the machine.
    pub procs: usize,
    /// The policy both kernels ran with.
    pub schedule: Schedule,
    /// The triangular kernel.
    pub loop1: KernelReport,
    /// The skewed kernel.
    pub loop2: KernelReport,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "OMP config: threads={} procs={} schedule={} chunk={}",
            self.threads,
            self.procs,
            self.schedule.kind,
            self.schedule.chunk_size()
        )?;
        writeln!(f, "Loop 1 check: Sum of a is {:.6}", self.loop1.checksum)?;
        writeln!(
            f,
            "Total time for {} reps of loop 1 = {:.6}",
            self.loop1.reps,
            self.loop1.elapsed.as_secs_f64()
        )?;
        writeln!(f, "Loop 2 check: Sum of c is {:.6}", self.loop2.checksum)?;
        write!(
            f,
            "Total time for {} reps of loop 2 = {:.6}",
            self.loop2.reps,
            self.loop2.elapsed.as_secs_f64()
        )
    }
}

/// Runs both kernels under one configuration.
///
/// ```
/// use lopsided::*;
///
/// let config = BenchConfig {
///     size: 32,
///     reps: 2,
///     num_threads: 2,
///     schedule: Schedule::with_chunk(ScheduleKind::Dynamic, 4),
///     ..Default::default()
/// };
/// let report = Benchmark::new(config).unwrap().run().unwrap();
///
/// assert_eq!(report.threads, 2);
/// assert_eq!(report.loop1.reps, 2);
/// ```
#[derive(Debug)]
pub struct Benchmark {
    config: BenchConfig,
    pool: ThreadPool,
}

impl Benchmark {
    /// Validates `config` and starts the team. Fails if a worker thread can't be started.
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPool::new(&config.pool_descriptor())?;
        Ok(Self { config, pool })
    }

    /// The configuration of this benchmark.
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Initializes a fresh workload, then times `reps` full sweeps of each kernel and validates
    /// the results.
    pub fn run(&self) -> Result<Report> {
        let BenchConfig {
            size,
            reps,
            schedule,
            ..
        } = self.config;
        let mut workload = Workload::new(size);

        workload.init1();
        let threads = self.pool.thread_num();
        let procs = num_cpus::get();
        tracing::info!(threads, procs, %schedule, size, reps, "starting benchmark");

        let loop1 = {
            let _span = tracing::info_span!("loop1").entered();
            let pool = &self.pool;
            let elapsed = time_reps(reps, || workload.loop1(pool, schedule, 0..size).map(drop))?;
            let checksum = workload.valid1();
            tracing::debug!(checksum, ?elapsed, "loop 1 done");
            KernelReport {
                checksum,
                elapsed,
                reps,
            }
        };

        workload.init2();
        let loop2 = {
            let _span = tracing::info_span!("loop2").entered();
            let pool = &self.pool;
            let elapsed = time_reps(reps, || workload.loop2(pool, schedule, 0..size).map(drop))?;
            let checksum = workload.valid2();
            tracing::debug!(checksum, ?elapsed, "loop 2 done");
            KernelReport {
                checksum,
                elapsed,
                reps,
            }
        };

        Ok(Report {
            threads,
            procs,
            schedule,
            loop1,
            loop2,
        })
    }
}
