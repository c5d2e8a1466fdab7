use std::mem;
use std::ops::Range;

use crate::schedule::{Dispatch, Schedule};
use crate::ThreadPool;

/// Helper functions to sweep the rows of a flat, row-major buffer in parallel.
pub trait ParallelRowsMut<T: Send>: AsMut<[T]> {
    /// Calls `f` once for every row index in `rows`, together with that row's mutable slice of
    /// `row_len` elements. The rows are spread over the execution units of `pool` as `schedule`
    /// dictates. No two units ever see the same row.
    ///
    /// Returns the number of rows each unit processed. Units that got no work are omitted.
    ///
    /// Panics if `rows` reaches past the end of the buffer.
    ///
    /// # Example
    ///
    /// ```
    /// use lopsided::*;
    ///
    /// let pool = ThreadPool::new(&ThreadPoolDescriptor::default()).unwrap();
    /// let mut v = vec![0usize; 4 * 3];
    ///
    /// let loads = v.par_rows_mut(&pool, Schedule::new(ScheduleKind::Dynamic), 1..4, 3, |row, values| {
    ///     for value in values.iter_mut() {
    ///         *value = row;
    ///     }
    /// });
    ///
    /// assert_eq!(loads.iter().sum::<usize>(), 3);
    /// assert_eq!(v, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 3]);
    /// ```
    fn par_rows_mut<F>(
        &mut self,
        pool: &ThreadPool,
        schedule: Schedule,
        rows: Range<usize>,
        row_len: usize,
        f: F,
    ) -> Vec<usize>
    where
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        if rows.start >= rows.end {
            return Vec::new();
        }

        let units = pool.thread_num();
        let partition = schedule.partition(rows.clone(), units);

        // Split the swept rows into one disjoint mutable piece per chunk.
        let mut rest = &mut self.as_mut()[rows.start * row_len..rows.end * row_len];
        let mut pieces = Vec::with_capacity(partition.chunks.len());
        for chunk in partition.chunks {
            let (head, tail) = mem::take(&mut rest).split_at_mut(chunk.len() * row_len);
            pieces.push((chunk, head));
            rest = tail;
        }

        let f = &f;
        let sweep = move |chunk: Range<usize>, values: &mut [T]| {
            let len = chunk.len();
            if row_len == 0 {
                chunk.for_each(|row| f(row, &mut []));
            } else {
                for (row, values) in chunk.zip(values.chunks_mut(row_len)) {
                    f(row, values);
                }
            }
            len
        };

        match partition.dispatch {
            Dispatch::RoundRobin => {
                let busy = units.min(pieces.len());
                let mut assigned: Vec<Vec<_>> = (0..busy).map(|_| Vec::new()).collect();
                for (k, piece) in pieces.into_iter().enumerate() {
                    assigned[k % busy].push(piece);
                }

                pool.scope(|scope| {
                    for unit_pieces in assigned {
                        scope.spawn(async move {
                            unit_pieces
                                .into_iter()
                                .map(|(chunk, values)| sweep(chunk, values))
                                .sum::<usize>()
                        });
                    }
                })
            }
            Dispatch::Queue => {
                let busy = units.min(pieces.len());
                let (tx, rx) = async_channel::bounded(pieces.len());
                for piece in pieces {
                    tx.try_send(piece)
                        .expect("the chunk queue holds every piece and its receiver is alive");
                }
                drop(tx);

                pool.scope(|scope| {
                    for _ in 0..busy {
                        let rx = rx.clone();
                        scope.spawn(async move {
                            let mut processed = 0;
                            while let Ok((chunk, values)) = rx.recv().await {
                                processed += sweep(chunk, values);
                            }
                            processed
                        });
                    }
                })
            }
        }
    }
}

impl<S, T: Send> ParallelRowsMut<T> for S where S: AsMut<[T]> {}
