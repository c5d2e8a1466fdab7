#![warn(missing_docs)]
//! Lopsided measures how loop scheduling policies cope with badly balanced work.
//!
//! Two kernels sweep the rows of a square matrix on a fork-join team of threads. The first one
//! does less work the further down a row is (a triangle), the second one does nearly nothing on
//! most rows and a full quadratic pass on a few clustered ones. Each row is handled by exactly
//! one execution unit; which unit gets which rows is decided by a [`Schedule`], just like an
//! OpenMP `schedule(runtime)` loop.
//!
//! The checksums never depend on the schedule or the team size, only the wall time does.
//!
//! # Example
//!
//! ```
//! use lopsided::*;
//!
//! let pool = ThreadPool::new(&ThreadPoolDescriptor {
//!     num_threads: 4,
//!     ..Default::default()
//! })
//! .expect("can't create thread pool");
//!
//! let mut even = Workload::new(100);
//! let mut guided = Workload::new(100);
//! even.init1();
//! guided.init1();
//!
//! even.loop1(&pool, Schedule::new(ScheduleKind::Static), 0..100).unwrap();
//! guided.loop1(&pool, "guided,8".parse().unwrap(), 0..100).unwrap();
//!
//! assert_eq!(even.valid1(), guided.valid1());
//! ```

mod config;
mod error;
mod harness;
pub mod kernel;
mod pool;
mod schedule;
mod slice;
mod workload;

pub use config::{BenchConfig, N, REPS, THREADS_ENV};
pub use error::{Error, Result};
pub use harness::{time_reps, Benchmark, KernelReport, Report};
pub use pool::{Scope, ThreadPool, ThreadPoolDescriptor};
pub use schedule::{Dispatch, Partition, Schedule, ScheduleKind, SCHEDULE_ENV};
pub use slice::ParallelRowsMut;
pub use workload::Workload;
