use std::ops::Range;

use crate::error::{Error, Result};
use crate::kernel;
use crate::schedule::Schedule;
use crate::slice::ParallelRowsMut;
use crate::ThreadPool;

/// The numeric state both kernels work on: two `n x n` matrices `a` and `b`, the vector `c` and
/// the row bound table `jmax`. Matrices are stored row-major.
///
/// `init1` prepares the state for `loop1`/`valid1`, `init2` for `loop2`/`valid2`. The kernels
/// accumulate, so repeated calls add up.
///
/// ```
/// use lopsided::*;
///
/// let pool = ThreadPool::new(&ThreadPoolDescriptor::default()).unwrap();
/// let mut workload = Workload::new(64);
///
/// workload.init2();
/// workload.loop2(&pool, Schedule::new(ScheduleKind::Guided), 0..64).unwrap();
/// // `b` stays below one, so every logarithm is negative.
/// assert!(workload.valid2() < 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    n: usize,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    jmax: Vec<usize>,
}

impl Workload {
    /// Allocates a zeroed workload of size `n`.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            a: vec![0.0; n * n],
            b: vec![0.0; n * n],
            c: vec![0.0; n],
            jmax: vec![0; n],
        }
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.n
    }

    /// Matrix `a`, row-major.
    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Matrix `b`, row-major.
    pub fn b(&self) -> &[f64] {
        &self.b
    }

    /// Vector `c`.
    pub fn c(&self) -> &[f64] {
        &self.c
    }

    /// Inner iteration bound of every row of the skewed kernel.
    pub fn jmax(&self) -> &[usize] {
        &self.jmax
    }

    /// Sets `b[i][j] = 3.142 * (i + j)` and clears `a`.
    pub fn init1(&mut self) {
        let n = self.n;
        for i in 0..n {
            for j in 0..n {
                self.a[i * n + j] = 0.0;
                self.b[i * n + j] = 3.142 * (i + j) as f64;
            }
        }
    }

    /// Fills `jmax`, clears `c` and sets `b[i][j] = (i * j + 1) / n²`.
    pub fn init2(&mut self) {
        let n = self.n;
        for i in 0..n {
            self.jmax[i] = kernel::row_bound(i, n);
            self.c[i] = 0.0;
        }

        let n2 = (n * n) as f64;
        for i in 0..n {
            for j in 0..n {
                self.b[i * n + j] = (i * j + 1) as f64 / n2;
            }
        }
    }

    /// Triangular kernel over `rows`, fanned out over `pool` according to `schedule`.
    ///
    /// Returns the number of rows each execution unit handled.
    pub fn loop1(
        &mut self,
        pool: &ThreadPool,
        schedule: Schedule,
        rows: Range<usize>,
    ) -> Result<Vec<usize>> {
        self.check_rows(&rows)?;

        let Self { n, a, b, .. } = self;
        let n = *n;
        let b = &b[..];

        let loads = a.par_rows_mut(pool, schedule, rows, n, |i, a_row| {
            kernel::triangular_row(i, &b[i * n..(i + 1) * n], a_row);
        });
        tracing::trace!(?loads, "loop 1");
        Ok(loads)
    }

    /// Skewed kernel over `rows`, fanned out over `pool` according to `schedule`.
    ///
    /// Returns the number of rows each execution unit handled.
    pub fn loop2(
        &mut self,
        pool: &ThreadPool,
        schedule: Schedule,
        rows: Range<usize>,
    ) -> Result<Vec<usize>> {
        self.check_rows(&rows)?;

        let Self { n, b, c, jmax, .. } = self;
        let n = *n;
        let (b, jmax) = (&b[..], &jmax[..]);
        let inv_n2 = 1.0 / (n * n) as f64;

        let loads = c.par_rows_mut(pool, schedule, rows, 1, |i, c_row| {
            kernel::skewed_row(&b[i * n..(i + 1) * n], jmax[i], inv_n2, &mut c_row[0]);
        });
        tracing::trace!(?loads, "loop 2");
        Ok(loads)
    }

    /// Sum over all cells of `a`.
    pub fn valid1(&self) -> f64 {
        self.a.iter().sum()
    }

    /// Sum over all elements of `c`.
    pub fn valid2(&self) -> f64 {
        self.c.iter().sum()
    }

    fn check_rows(&self, rows: &Range<usize>) -> Result<()> {
        if rows.start > rows.end || rows.end > self.n {
            return Err(Error::RowRange {
                start: rows.start,
                end: rows.end,
                rows: self.n,
            });
        }
        Ok(())
    }
}

/// Checksums evaluated straight from the generator formulas, without any partitioning.
#[cfg(test)]
pub(crate) mod closed_form {
    use crate::kernel;

    pub(crate) fn relative_error(got: f64, expected: f64) -> f64 {
        (got - expected).abs() / expected.abs().max(1.0)
    }

    /// Triangular checksum after `reps` repetitions.
    pub(crate) fn expected_valid1(n: usize, reps: usize) -> f64 {
        let mut sum = 0.0;
        for i in 0..n {
            for j in i + 1..n {
                sum += (3.142 * (i + j) as f64).cos();
            }
        }
        reps as f64 * sum
    }

    /// Skewed checksum after `reps` repetitions.
    pub(crate) fn expected_valid2(n: usize, reps: usize) -> f64 {
        let n2 = (n * n) as f64;
        let mut sum = 0.0;
        for i in 0..n {
            for j in 0..kernel::row_bound(i, n) {
                let ln = ((i * j + 1) as f64 / n2).ln();
                for k in 0..j {
                    sum += (k + 1) as f64 * ln / n2;
                }
            }
        }
        reps as f64 * sum
    }
}

#[cfg(test)]
mod tests {
    use super::closed_form::{expected_valid1, expected_valid2, relative_error};
    use super::*;
    use crate::schedule::ScheduleKind;
    use crate::ThreadPoolDescriptor;

    fn pool(num_threads: usize) -> ThreadPool {
        ThreadPool::new(&ThreadPoolDescriptor {
            num_threads,
            ..Default::default()
        })
        .unwrap()
    }

    fn schedules() -> Vec<Schedule> {
        let mut schedules = Vec::new();
        for kind in ScheduleKind::ALL.iter().copied() {
            for chunk in [0usize, 1, 5, 64].iter().copied() {
                schedules.push(Schedule::with_chunk(kind, chunk));
            }
        }
        schedules
    }

    #[test]
    fn test_jmax_boundaries() {
        let mut workload = Workload::new(729);
        workload.init2();
        assert_eq!(workload.jmax()[0], 729);
        assert_eq!(workload.jmax()[29], 729);
        assert_eq!(workload.jmax()[30], 1);
        assert!(workload.jmax()[..30].iter().all(|&bound| bound == 729));
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut once = Workload::new(40);
        once.init1();
        let mut twice = once.clone();
        twice.init1();
        assert_eq!(once, twice);

        once.init2();
        let mut twice = once.clone();
        twice.init2();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_init2_keeps_b_positive() {
        let mut workload = Workload::new(50);
        workload.init2();
        assert!(workload.b().iter().all(|&v| v > 0.0));
        assert!(workload.c().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_loop1_writes_upper_triangle_only() {
        let pool = pool(3);
        let n = 33;
        let mut workload = Workload::new(n);
        workload.init1();
        workload
            .loop1(&pool, Schedule::new(ScheduleKind::Dynamic), 0..n)
            .unwrap();

        for i in 0..n {
            for j in 0..n {
                let value = workload.a()[i * n + j];
                if j > i {
                    assert_eq!(value, workload.b()[i * n + j].cos());
                } else {
                    assert_eq!(value, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_sub_ranges_compose() {
        let pool = pool(4);
        let n = 45;
        let schedule = Schedule::with_chunk(ScheduleKind::Guided, 2);

        let mut whole = Workload::new(n);
        whole.init1();
        whole.loop1(&pool, schedule, 0..n).unwrap();
        whole.init2();
        whole.loop2(&pool, schedule, 0..n).unwrap();

        let mut split = Workload::new(n);
        split.init1();
        split.loop1(&pool, schedule, 0..17).unwrap();
        // Rows outside the sweep stay untouched.
        assert!(split.a()[17 * n..].iter().all(|&v| v == 0.0));
        split.loop1(&pool, schedule, 17..n).unwrap();
        split.init2();
        split.loop2(&pool, schedule, 30..n).unwrap();
        split.loop2(&pool, schedule, 0..30).unwrap();

        assert_eq!(whole, split);
    }

    #[test]
    fn test_invalid_row_range() {
        let pool = pool(1);
        let mut workload = Workload::new(10);
        workload.init1();
        assert!(matches!(
            workload.loop1(&pool, Schedule::default(), 0..11),
            Err(Error::RowRange { end: 11, rows: 10, .. })
        ));
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = 6..2;
        assert!(workload.loop2(&pool, Schedule::default(), reversed).is_err());
        assert_eq!(workload.loop1(&pool, Schedule::default(), 4..4).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_checksums_independent_of_schedule_and_team() {
        let n = 96;
        let reps = 3;

        let reference = {
            let pool = pool(1);
            let mut workload = Workload::new(n);
            workload.init1();
            for _ in 0..reps {
                workload.loop1(&pool, Schedule::default(), 0..n).unwrap();
            }
            let valid1 = workload.valid1();
            workload.init2();
            for _ in 0..reps {
                workload.loop2(&pool, Schedule::default(), 0..n).unwrap();
            }
            (valid1, workload.valid2())
        };

        for threads in [1usize, 2, 4, 7].iter().copied() {
            let pool = pool(threads);
            for schedule in schedules() {
                let mut workload = Workload::new(n);
                workload.init1();
                for _ in 0..reps {
                    workload.loop1(&pool, schedule, 0..n).unwrap();
                }
                let valid1 = workload.valid1();
                workload.init2();
                for _ in 0..reps {
                    workload.loop2(&pool, schedule, 0..n).unwrap();
                }

                // Every cell is accumulated in the same order, so the sums match exactly.
                assert_eq!((valid1, workload.valid2()), reference, "{} on {} threads", schedule, threads);
            }
        }
    }

    #[test]
    fn test_checksums_match_direct_sums() {
        let n = 729;
        let reps = 2;
        let (expected1, expected2) = (expected_valid1(n, reps), expected_valid2(n, reps));

        for threads in [1usize, 4].iter().copied() {
            let pool = pool(threads);
            let schedule = Schedule::with_chunk(ScheduleKind::Dynamic, 16);

            let mut workload = Workload::new(n);
            workload.init1();
            for _ in 0..reps {
                workload.loop1(&pool, schedule, 0..n).unwrap();
            }
            assert!(relative_error(workload.valid1(), expected1) <= 1e-9);

            workload.init2();
            for _ in 0..reps {
                workload.loop2(&pool, schedule, 0..n).unwrap();
            }
            assert!(relative_error(workload.valid2(), expected2) <= 1e-9);
        }
    }
}
